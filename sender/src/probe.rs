//! Infers endpoint reachability and credential validity from the side
//! effects of ordinary requests. The target API has no health or auth-check
//! route, so both probes read generic status codes and response bodies.

use crate::telemetry::{CredentialStatus, ProbeResult};
use crate::transport::{HttpRequest, HttpTransport, TransportError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimal record submitted by the credential probe. It carries only
/// identifying fields so a real receiver rejects its content.
pub fn validation_probe_body() -> Value {
    json!({
        "DeviceName": "API_KEY_VALIDATION_TEST",
        "DeviceId": "TEST_VALIDATION_ONLY",
    })
}

#[derive(Clone)]
pub struct ProbeEngine {
    transport: Arc<dyn HttpTransport>,
}

impl ProbeEngine {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Issues a GET against the endpoint. Strictly binary: any response with
    /// a success status is `Connected`, everything else is `Disconnected`.
    pub async fn probe_reachability(&self, endpoint: &str) -> ProbeResult {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return ProbeResult::Disconnected("API URL not set".to_string());
        }

        debug!("Probing reachability of {}", endpoint);

        let result = match self.transport.send(HttpRequest::get(endpoint)).await {
            Err(e) => ProbeResult::Disconnected(format!("Connection failed: {}", e)),
            Ok(response) if !response.is_success() => ProbeResult::Disconnected(format!(
                "API returned {} {}",
                response.status, response.status_text
            )),
            Ok(response) => {
                let message = match response.json_or_empty().get("service") {
                    Some(Value::String(service)) => format!("{} - Running", service),
                    _ => "API is running".to_string(),
                };
                ProbeResult::Connected(message)
            }
        };

        info!("Reachability of {}: {}", endpoint, result);
        result
    }

    /// Submits [`validation_probe_body`] with the credential and classifies
    /// the outcome with [`classify_credential_response`].
    pub async fn probe_credential(&self, endpoint: &str, credential: &str) -> CredentialStatus {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() || credential.is_empty() {
            return CredentialStatus::Unknown("API Key not provided".to_string());
        }

        debug!("Probing credential against {}", endpoint);

        let request = HttpRequest::post(endpoint, credential, validation_probe_body());
        let result = match self.transport.send(request).await {
            Err(e) => classify_credential_failure(&e),
            Ok(response) => {
                classify_credential_response(response.status, &response.json_or_empty())
            }
        };

        match &result {
            CredentialStatus::Invalid(_) => {
                warn!("Credential check against {}: {}", endpoint, result)
            }
            _ => info!("Credential check against {}: {}", endpoint, result),
        }
        result
    }
}

/// Transport failures: connectivity problems say nothing about the key.
pub fn classify_credential_failure(err: &TransportError) -> CredentialStatus {
    if err.is_connectivity() {
        CredentialStatus::Unknown("Cannot validate - check connection".to_string())
    } else {
        CredentialStatus::Invalid(format!("Validation error: {}", err))
    }
}

/// Classifies a response to the credential probe.
///
/// The 400 branch is the subtle one: the target API reports both bad auth and
/// bad payloads as 400, so the body is searched for an unauthorized signal.
/// A 400 without one means authentication passed and the deliberately bad
/// payload was rejected instead. This assumes the receiver's error-body shape
/// (`error` / `message` fields) and is best-effort, not a protocol guarantee.
pub fn classify_credential_response(status: u16, body: &Value) -> CredentialStatus {
    match status {
        401 => CredentialStatus::Invalid("Invalid API key - Authentication failed".to_string()),
        200 | 201 => CredentialStatus::Valid("API key is valid".to_string()),
        400 if has_unauthorized_signal(body) => {
            CredentialStatus::Invalid("Invalid API key".to_string())
        }
        400 => CredentialStatus::Valid("API key is valid".to_string()),
        other => CredentialStatus::Invalid(format!("Unexpected response: {}", other)),
    }
}

fn has_unauthorized_signal(body: &Value) -> bool {
    let error_is_unauthorized = body.get("error").and_then(Value::as_str) == Some("Unauthorized");
    let message_mentions_auth = body
        .get("message")
        .and_then(Value::as_str)
        .map(|m| {
            let m = m.to_lowercase();
            m.contains("api key") || m.contains("unauthorized")
        })
        .unwrap_or(false);

    error_is_unauthorized || message_mentions_auth
}
