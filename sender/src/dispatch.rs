//! Issues submissions and reduces their outcomes into history entries.

use crate::errors::{Error, Result};
use crate::history::HistorySink;
use crate::telemetry::DispatchResult;
use crate::transport::{HttpRequest, HttpTransport};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    history: Arc<dyn HistorySink>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, history: Arc<dyn HistorySink>) -> Self {
        Self { transport, history }
    }

    /// Submits `record_text` to the endpoint with the credential.
    ///
    /// Missing configuration and unparseable text are returned as errors
    /// before any request is made and leave the history untouched. Every
    /// attempted request, successful or not, produces exactly one history
    /// entry. There are no retries.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        credential: &str,
        record_text: &str,
    ) -> Result<DispatchResult> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() || credential.is_empty() {
            return Err(Error::Configuration(
                "Please provide both API URL and API Key".to_string(),
            ));
        }

        let record: Value = serde_json::from_str(record_text)
            .map_err(|e| Error::payload_parse("Invalid JSON payload", e))?;

        debug!("Dispatching record to {}", endpoint);

        let request = HttpRequest::post(endpoint, credential, record.clone());
        let issued_at = Utc::now();

        let result = match self.transport.send(request).await {
            Ok(response) => {
                let body = response.json_or_empty();
                let succeeded = response.is_success();
                let error_message = (!succeeded).then(|| {
                    body.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            format!("{} {}", response.status, response.status_text)
                        })
                });
                DispatchResult {
                    id: Uuid::new_v4(),
                    succeeded,
                    status: Some(response.status),
                    response_body: Some(body),
                    error_message,
                    request_body: record,
                    issued_at,
                }
            }
            Err(e) => DispatchResult {
                id: Uuid::new_v4(),
                succeeded: false,
                status: None,
                response_body: None,
                error_message: Some(if e.message.is_empty() {
                    "Network error".to_string()
                } else {
                    e.message.clone()
                }),
                request_body: record,
                issued_at,
            },
        };

        match (&result.status, &result.error_message) {
            (Some(status), None) => info!("Dispatch to {} accepted with {}", endpoint, status),
            (Some(status), Some(msg)) => {
                warn!("Dispatch to {} rejected with {}: {}", endpoint, status, msg)
            }
            (None, msg) => warn!(
                "Dispatch to {} failed: {}",
                endpoint,
                msg.as_deref().unwrap_or_default()
            ),
        }

        self.history.record(result.clone());
        Ok(result)
    }

    /// Serializes `record` and dispatches it
    pub async fn dispatch_record(
        &self,
        endpoint: &str,
        credential: &str,
        record: &Value,
    ) -> Result<DispatchResult> {
        let text = serde_json::to_string(record)?;
        self.dispatch(endpoint, credential, &text).await
    }
}

impl DispatchResult {
    /// Converts a failed outcome into the matching error
    pub fn into_result(self) -> Result<DispatchResult> {
        if self.succeeded {
            return Ok(self);
        }
        match self.status {
            Some(status) => Err(Error::Remote {
                status,
                body: self.response_body.unwrap_or(Value::Null),
            }),
            None => Err(Error::Transport(crate::transport::TransportError::new(
                crate::transport::TransportErrorKind::Request,
                self.error_message.unwrap_or_default(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::transport::{
        HttpResponse, Method, MockHttpTransport, TransportError, TransportErrorKind,
    };
    use serde_json::json;

    fn dispatcher(mock: MockHttpTransport) -> (Dispatcher, Arc<History>) {
        let history = Arc::new(History::unbounded());
        (Dispatcher::new(Arc::new(mock), history.clone()), history)
    }

    #[tokio::test]
    async fn test_accepted_submission() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r: &HttpRequest| {
                r.method == Method::Post
                    && r.url == "https://x/y"
                    && r.bearer.as_deref() == Some("abc")
                    && r.body == Some(json!({"a": 1}))
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(201, r#"{"id":"r1"}"#)));

        let (dispatcher, history) = dispatcher(mock);
        let result = dispatcher.dispatch("https://x/y", "abc", r#"{"a":1}"#).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.response_body, Some(json!({"id": "r1"})));
        assert!(result.error_message.is_none());
        assert_eq!(result.request_body, json!({"a": 1}));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().id, result.id);
    }

    #[tokio::test]
    async fn test_malformed_json_issues_no_request() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(0);

        let (dispatcher, history) = dispatcher(mock);
        let err = dispatcher.dispatch("https://x/y", "abc", "{\"a\":").await.unwrap_err();

        assert!(matches!(err, Error::PayloadParse { .. }));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_configuration_issues_no_request() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(0);

        let (dispatcher, history) = dispatcher(mock);
        let err = dispatcher.dispatch("", "abc", "{}").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = dispatcher.dispatch("https://x/y", "", "{}").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_uses_body_message() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Ok(HttpResponse::new(
                400,
                r#"{"error":"ValidationError","message":"DeviceName too short"}"#,
            ))
        });

        let (dispatcher, history) = dispatcher(mock);
        let result = dispatcher.dispatch("https://x/y", "abc", "{}").await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.status, Some(400));
        assert_eq!(result.error_message.as_deref(), Some("DeviceName too short"));
        assert_eq!(history.len(), 1);

        let err = result.into_result().unwrap_err();
        assert!(matches!(err, Error::Remote { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_rejection_without_message_falls_back_to_status() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(500, "oops")));

        let (dispatcher, _) = dispatcher(mock);
        let result = dispatcher.dispatch("https://x/y", "abc", "[1,2]").await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.response_body, Some(json!({})));
        assert_eq!(
            result.error_message.as_deref(),
            Some("500 Internal Server Error")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_recorded() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            ))
        });

        let (dispatcher, history) = dispatcher(mock);
        let result = dispatcher.dispatch("https://x/y", "abc", "{}").await.unwrap();

        assert!(!result.succeeded);
        assert!(result.status.is_none());
        assert!(result.response_body.is_none());
        assert_eq!(result.error_message.as_deref(), Some("connection refused"));
        assert_eq!(history.len(), 1);
        assert!(matches!(result.into_result(), Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_each_dispatch_prepends_one_entry() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        let (dispatcher, history) = dispatcher(mock);
        let first = dispatcher
            .dispatch_record("https://x/y", "abc", &json!({"n": 1}))
            .await
            .unwrap();
        let second = dispatcher
            .dispatch_record("https://x/y", "abc", &json!({"n": 2}))
            .await
            .unwrap();

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second.id);
        assert_eq!(entries[1].id, first.id);
        assert_eq!(entries[1].request_body, json!({"n": 1}));
    }
}
