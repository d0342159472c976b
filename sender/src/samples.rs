//! Static catalog of named telemetry templates.

use crate::telemetry::{SampleEntry, TelemetryRecord};
use lazy_static::lazy_static;
use serde::Deserialize;

const CATALOG_JSON: &str = include_str!("../data/sample-payloads.json");

#[derive(Debug, Deserialize)]
struct Catalog {
    payloads: Vec<SampleEntry>,
    invalid_payloads: Vec<SampleEntry>,
}

lazy_static! {
    static ref CATALOG: Catalog =
        serde_json::from_str(CATALOG_JSON).expect("embedded sample catalog must be valid JSON");
    static ref EMPTY_RECORD: TelemetryRecord = TelemetryRecord::new();
}

/// Templates suitable for submission
pub fn sample_payloads() -> &'static [SampleEntry] {
    &CATALOG.payloads
}

/// Templates that a receiver is expected to reject
pub fn invalid_payloads() -> &'static [SampleEntry] {
    &CATALOG.invalid_payloads
}

/// Looks up an entry in either list, ignoring case
pub fn find_sample(name: &str) -> Option<&'static SampleEntry> {
    sample_payloads()
        .iter()
        .chain(invalid_payloads())
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Payload of the first valid sample
pub fn default_template() -> &'static TelemetryRecord {
    sample_payloads()
        .first()
        .map(|s| &s.payload)
        .unwrap_or(&*EMPTY_RECORD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!sample_payloads().is_empty());
        assert!(!invalid_payloads().is_empty());
    }

    #[test]
    fn test_default_template_is_first_sample() {
        let first = &sample_payloads()[0];
        assert_eq!(default_template(), &first.payload);
        assert!(default_template().contains_key("Location"));
    }

    #[test]
    fn test_find_sample_case_insensitive() {
        let sample = find_sample("low battery").unwrap();
        assert_eq!(sample.name, "Low Battery");

        let invalid = find_sample("MISSING DEVICEID").unwrap();
        assert!(!invalid.payload.contains_key("DeviceId"));

        assert!(find_sample("does not exist").is_none());
    }

    #[test]
    fn test_valid_samples_carry_synthesized_structures() {
        for sample in sample_payloads() {
            for key in ["Temperature", "Humidity", "Battery", "Location", "DeviceId"] {
                assert!(
                    sample.payload.contains_key(key),
                    "{} missing {}",
                    sample.name,
                    key
                );
            }
        }
    }
}
