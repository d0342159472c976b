use crate::model::Reading;
use std::collections::VecDeque;
use std::sync::RwLock;
use tracing::debug;

/// In-memory, newest-first store of accepted readings. Oldest readings are
/// dropped once `capacity` is reached.
#[derive(Debug)]
pub struct ReadingStore {
    readings: RwLock<VecDeque<Reading>>,
    capacity: usize,
}

impl ReadingStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn insert(&self, reading: Reading) {
        let mut readings = self
            .readings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        readings.push_front(reading);
        if readings.len() > self.capacity {
            readings.pop_back();
            debug!("Store at capacity {}, dropped oldest reading", self.capacity);
        }
    }

    /// Matching readings newest first, plus the total number of matches
    pub fn query(
        &self,
        device_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Reading>, usize) {
        let readings = self
            .readings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let matching: Vec<&Reading> = readings
            .iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .collect();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }

    pub fn len(&self) -> usize {
        self.readings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn reading(device_id: &str, n: i64) -> Reading {
        Reading {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            device_name: "Tracker".to_string(),
            entry_time: Utc::now(),
            received_at: Utc::now(),
            payload: json!({ "n": n }),
        }
    }

    #[test]
    fn test_query_filters_and_pages() {
        let store = ReadingStore::new(100);
        for n in 0..6 {
            store.insert(reading(if n % 2 == 0 { "dev-a" } else { "dev-b" }, n));
        }

        let (page, total) = store.query(Some("dev-a"), 2, 0);
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].payload["n"], 4);
        assert_eq!(page[1].payload["n"], 2);

        let (page, total) = store.query(None, 10, 5);
        assert_eq!(total, 6);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].payload["n"], 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let store = ReadingStore::new(3);
        for n in 0..5 {
            store.insert(reading("dev-a", n));
        }

        assert_eq!(store.len(), 3);
        let (page, _) = store.query(None, 10, 0);
        assert_eq!(page.last().unwrap().payload["n"], 2);
    }
}
