use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An accepted tracker reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Uuid,
    pub device_id: String,
    pub device_name: String,
    pub entry_time: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

/// REST API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadingsResponse {
    pub data: Vec<Reading>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub id: Uuid,
    pub status: String,
}

/// Error body shape shared by every rejection
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
