//! Most-recent-first record of dispatch outcomes.

use crate::telemetry::DispatchResult;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Where the dispatcher writes its outcomes
pub trait HistorySink: Send + Sync {
    fn record(&self, entry: DispatchResult);
}

/// In-memory history. Unbounded unless a limit is given, in which case the
/// oldest entries are evicted once the limit is reached.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<VecDeque<DispatchResult>>,
    limit: Option<usize>,
}

impl History {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(limit: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(limit.min(1024))),
            limit: Some(limit.max(1)),
        }
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => Self::bounded(limit),
            None => Self::unbounded(),
        }
    }

    /// Snapshot, newest first
    pub fn entries(&self) -> Vec<DispatchResult> {
        self.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<DispatchResult> {
        self.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// (succeeded, failed)
    pub fn tally(&self) -> (usize, usize) {
        let entries = self.lock();
        let ok = entries.iter().filter(|e| e.succeeded).count();
        (ok, entries.len() - ok)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DispatchResult>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl HistorySink for History {
    fn record(&self, entry: DispatchResult) {
        let mut entries = self.lock();
        entries.push_front(entry);
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }
    }
}
