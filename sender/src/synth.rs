//! Payload synthesis: derives a fresh, plausible reading from a template.

use crate::errors::{Error, Result};
use crate::samples::default_template;
use crate::telemetry::TelemetryRecord;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

const WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

pub const CELSIUS_RANGE: (f64, f64) = (-10.0, 20.0);
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);
pub const BATTERY_MAX_PERCENT: u32 = 99;
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);
pub const ACCURACY_MAX_METERS: u32 = 499;
pub const BATTERY_ESTIMATIONS: [&str; 4] = ["N/A", "Days", "Weeks", "Months"];
const CHARGING_PROBABILITY: f64 = 0.2;

/// Synthesizes a new record from `template` using the thread RNG and the
/// current time. The template itself is never modified.
pub fn synthesize(template: &TelemetryRecord) -> TelemetryRecord {
    synthesize_with(template, &mut rand::thread_rng(), Utc::now())
}

/// Deterministic core of [`synthesize`].
///
/// Top-level keys of the template are kept except the ones overwritten here.
/// `Location` is merged so identifiers like `FormattedAddress` survive.
/// `Fahrenheit`, `Kilometers` and `Miles` are set to null on purpose: they are
/// redundant with the sampled values and left to the receiver to derive.
pub fn synthesize_with<R: Rng>(
    template: &TelemetryRecord,
    rng: &mut R,
    now: DateTime<Utc>,
) -> TelemetryRecord {
    let mut record = template.clone();

    let entry_time = now - Duration::milliseconds(rng.gen_range(0..WINDOW_MS));
    record.insert(
        "EntryTimeEpoch".to_string(),
        json!(entry_time.timestamp_millis()),
    );
    record.insert(
        "EntryTimeUtc".to_string(),
        json!(format_entry_time(entry_time)),
    );

    let celsius = round_to(rng.gen_range(CELSIUS_RANGE.0..=CELSIUS_RANGE.1), 2);
    record.insert(
        "Temperature".to_string(),
        json!({ "Celsius": celsius, "Fahrenheit": null }),
    );

    let humidity = round_to(rng.gen_range(HUMIDITY_RANGE.0..=HUMIDITY_RANGE.1), 1);
    record.insert("Humidity".to_string(), json!({ "Percentage": humidity }));

    let estimation = BATTERY_ESTIMATIONS.choose(rng).copied().unwrap_or("N/A");
    record.insert(
        "Battery".to_string(),
        json!({
            "Percentage": rng.gen_range(0..=BATTERY_MAX_PERCENT),
            "Estimation": estimation,
            "IsCharging": rng.gen_bool(CHARGING_PROBABILITY),
        }),
    );

    let mut location = match template.get("Location") {
        Some(Value::Object(existing)) => existing.clone(),
        _ => TelemetryRecord::new(),
    };
    location.insert(
        "Latitude".to_string(),
        json!(rng.gen_range(LATITUDE_RANGE.0..=LATITUDE_RANGE.1)),
    );
    location.insert(
        "Longitude".to_string(),
        json!(rng.gen_range(LONGITUDE_RANGE.0..=LONGITUDE_RANGE.1)),
    );
    location.insert(
        "Accuracy".to_string(),
        json!({
            "Meters": rng.gen_range(0..=ACCURACY_MAX_METERS),
            "Kilometers": null,
            "Miles": null,
        }),
    );
    record.insert("Location".to_string(), Value::Object(location));

    record
}

/// Caller-side boundary for synthesis from editor text.
///
/// Blank text and non-object JSON fall back to the default catalog template.
pub fn synthesize_from_text(text: &str) -> Result<TelemetryRecord> {
    if text.trim().is_empty() {
        return Ok(synthesize(default_template()));
    }

    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| Error::payload_parse("Invalid JSON in payload editor", e))?;

    Ok(match parsed {
        Value::Object(template) => synthesize(&template),
        _ => synthesize(default_template()),
    })
}

/// ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_entry_time(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
