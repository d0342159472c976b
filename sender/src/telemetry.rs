//! Telemetry records and the outcome types produced by the probe and dispatch engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// One device reading. Open-ended: only a handful of nested fields are
/// interpreted by the synthesizer, everything else is passed through.
pub type TelemetryRecord = Map<String, Value>;

/// A named template from the static sample catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    pub name: String,
    pub description: String,
    pub payload: TelemetryRecord,
}

/// Endpoint reachability state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message")]
pub enum ProbeResult {
    Checking,
    Connected(String),
    Disconnected(String),
}

impl ProbeResult {
    pub fn is_connected(&self) -> bool {
        matches!(self, ProbeResult::Connected(_))
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Checking => write!(f, "checking"),
            ProbeResult::Connected(msg) => write!(f, "connected ({})", msg),
            ProbeResult::Disconnected(msg) => write!(f, "disconnected ({})", msg),
        }
    }
}

/// Credential validity state.
///
/// `Unknown` means there was not enough signal to decide, either because no
/// credential was supplied or because the probe hit a connectivity problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message")]
pub enum CredentialStatus {
    Checking,
    Valid(String),
    Invalid(String),
    Unknown(String),
}

impl CredentialStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CredentialStatus::Valid(_))
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStatus::Checking => write!(f, "checking"),
            CredentialStatus::Valid(msg) => write!(f, "valid ({})", msg),
            CredentialStatus::Invalid(msg) => write!(f, "invalid ({})", msg),
            CredentialStatus::Unknown(msg) => write!(f, "unknown ({})", msg),
        }
    }
}

/// Normalized outcome of one submission. Immutable once created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub id: Uuid,
    pub succeeded: bool,
    /// HTTP status, absent when no response was obtained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub request_body: Value,
    pub issued_at: DateTime<Utc>,
}
