use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;

const TEMP_MIN: f64 = -50.0;
const TEMP_MAX: f64 = 100.0;
const PERCENT_MIN: f64 = 0.0;
const PERCENT_MAX: f64 = 100.0;
const LATITUDE_LIMIT: f64 = 90.0;
const LONGITUDE_LIMIT: f64 = 180.0;
const DEVICE_NAME_MIN_LEN: usize = 3;

/// Fields pulled out of a payload that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub device_id: String,
    pub device_name: String,
    pub entry_time: DateTime<Utc>,
}

/// Validates a tracker payload
pub fn validate(payload: &Value) -> Result<ValidReading> {
    let object = payload
        .as_object()
        .ok_or_else(|| Error::Validation("Payload must be a JSON object".to_string()))?;

    // Validate device identity
    let device_name = required_str(payload, "DeviceName")?;
    if device_name.chars().count() < DEVICE_NAME_MIN_LEN {
        return Err(Error::Validation("DeviceName too short".to_string()));
    }
    let device_id = required_str(payload, "DeviceId")?;

    // Validate timestamps
    if !object.get("EntryTimeEpoch").is_some_and(Value::is_i64) {
        return Err(Error::Validation(
            "EntryTimeEpoch must be an integer".to_string(),
        ));
    }
    let entry_time = DateTime::parse_from_rfc3339(required_str(payload, "EntryTimeUtc")?)
        .map_err(|_| Error::Validation("EntryTimeUtc must be an ISO-8601 timestamp".to_string()))?
        .with_timezone(&Utc);

    // Validate optional sensor readings
    check_range(payload, &["Temperature", "Celsius"], TEMP_MIN, TEMP_MAX)?;
    check_range(payload, &["Humidity", "Percentage"], PERCENT_MIN, PERCENT_MAX)?;
    check_range(payload, &["Battery", "Percentage"], PERCENT_MIN, PERCENT_MAX)?;
    check_range(
        payload,
        &["Location", "Latitude"],
        -LATITUDE_LIMIT,
        LATITUDE_LIMIT,
    )?;
    check_range(
        payload,
        &["Location", "Longitude"],
        -LONGITUDE_LIMIT,
        LONGITUDE_LIMIT,
    )?;

    Ok(ValidReading {
        device_id: device_id.to_string(),
        device_name: device_name.to_string(),
        entry_time,
    })
}

fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str> {
    match payload.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Validation(format!("{} is required", field))),
    }
}

/// Absent or null fields pass; present ones must be numbers within [min, max]
fn check_range(payload: &Value, path: &[&str], min: f64, max: f64) -> Result<()> {
    let value = path.iter().try_fold(payload, |v, key| v.get(key));
    let name = path.join(".");
    match value {
        None | Some(Value::Null) => Ok(()),
        Some(v) => match v.as_f64() {
            Some(n) if (min..=max).contains(&n) => Ok(()),
            Some(n) => Err(Error::Validation(format!(
                "{} {} out of range [{}, {}]",
                name, n, min, max
            ))),
            None => Err(Error::Validation(format!("{} must be a number", name))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "DeviceName": "Tracker-A1042",
            "DeviceId": "863203051234567",
            "EntryTimeEpoch": 1714566896789i64,
            "EntryTimeUtc": "2024-05-01T12:34:56.789Z",
            "Temperature": { "Celsius": 4.25, "Fahrenheit": null },
            "Humidity": { "Percentage": 62.3 },
            "Battery": { "Percentage": 87, "Estimation": "Weeks", "IsCharging": false },
            "Location": { "Latitude": 40.7128, "Longitude": -74.006 }
        })
    }

    #[test]
    fn test_valid_payload() {
        let reading = validate(&valid_payload()).unwrap();
        assert_eq!(reading.device_id, "863203051234567");
        assert_eq!(reading.entry_time.timestamp_millis(), 1714566896789);
    }

    #[test]
    fn test_probe_payload_is_rejected() {
        let payload = json!({
            "DeviceName": "API_KEY_VALIDATION_TEST",
            "DeviceId": "TEST_VALIDATION_ONLY"
        });

        assert!(matches!(validate(&payload), Err(Error::Validation(_))));
    }

    #[test]
    fn test_short_device_name() {
        let mut payload = valid_payload();
        payload["DeviceName"] = json!("ab");

        let err = validate(&payload).unwrap_err();
        assert_eq!(err.to_string(), "DeviceName too short");
    }

    #[test]
    fn test_missing_device_id() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("DeviceId");

        let err = validate(&payload).unwrap_err();
        assert_eq!(err.to_string(), "DeviceId is required");
    }

    #[test]
    fn test_invalid_temperature() {
        let mut payload = valid_payload();
        payload["Temperature"]["Celsius"] = json!(150.0); // Out of range

        assert!(validate(&payload).is_err());
    }

    #[test]
    fn test_invalid_coordinates() {
        let mut payload = valid_payload();
        payload["Location"]["Latitude"] = json!(123.45);

        assert!(validate(&payload).is_err());
    }

    #[test]
    fn test_malformed_timestamp() {
        let mut payload = valid_payload();
        payload["EntryTimeUtc"] = json!("01/05/2024 12:34");

        assert!(validate(&payload).is_err());
    }

    #[test]
    fn test_null_readings_pass() {
        let mut payload = valid_payload();
        payload["Temperature"]["Celsius"] = Value::Null;
        payload.as_object_mut().unwrap().remove("Humidity");

        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn test_not_an_object() {
        assert!(validate(&json!([1, 2, 3])).is_err());
    }
}
