use crate::errors::Error;
use crate::metrics::{
    gather_metrics, ACCEPTED_TOTAL, AUTH_REJECTED_TOTAL, REQUESTS_TOTAL,
    VALIDATION_REJECTED_TOTAL,
};
use crate::model::{Accepted, ErrorBody, Reading, ReadingsResponse, ServiceInfo};
use crate::store::ReadingStore;
use crate::validate::validate;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "Mock Tive Receiver";

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub webhook_path: String,
    pub api_keys: Vec<String>,
    /// Status used for auth failures, 401 or 400
    pub auth_rejection_status: StatusCode,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            webhook_path: "/api/webhook/tive".to_string(),
            api_keys: vec!["test-key".to_string()],
            auth_rejection_status: StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ReceiverConfig>,
    store: Arc<ReadingStore>,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    device_id: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

pub fn create_router(config: ReceiverConfig, store: Arc<ReadingStore>) -> Router {
    let path = config.webhook_path.clone();
    let state = AppState {
        config: Arc::new(config),
        store,
    };

    Router::new()
        .route(&path, get(service_info).post(receive))
        .route("/api/v1/telemetry", get(get_readings))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
    })
}

async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    REQUESTS_TOTAL.inc();

    if !is_authorized(&headers, &state.config.api_keys) {
        AUTH_REJECTED_TOTAL.inc();
        warn!("Rejected submission with missing or unknown API key");
        return Err(AppError::new(Error::Unauthorized, &state.config));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::new(Error::BadRequest(e.to_string()), &state.config))?;

    let valid = validate(&payload).map_err(|e| {
        VALIDATION_REJECTED_TOTAL.inc();
        debug!("Validation failed: {}", e);
        AppError::new(e, &state.config)
    })?;

    let reading = Reading {
        id: Uuid::new_v4(),
        device_id: valid.device_id,
        device_name: valid.device_name,
        entry_time: valid.entry_time,
        received_at: Utc::now(),
        payload,
    };
    let id = reading.id;
    info!("Accepted reading {} from {}", id, reading.device_id);
    state.store.insert(reading);
    ACCEPTED_TOTAL.inc();

    Ok((
        StatusCode::CREATED,
        Json(Accepted {
            id,
            status: "accepted".to_string(),
        }),
    ))
}

async fn get_readings(
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> Json<ReadingsResponse> {
    let limit = params.limit.unwrap_or(100).min(1000);
    let offset = params.offset.unwrap_or(0);

    let (data, total) = state
        .store
        .query(params.device_id.as_deref(), limit, offset);

    Json(ReadingsResponse {
        data,
        total,
        limit,
        offset,
    })
}

async fn metrics_handler() -> String {
    gather_metrics()
}

fn is_authorized(headers: &HeaderMap, api_keys: &[String]) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| api_keys.iter().any(|k| k == token))
}

struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl AppError {
    fn new(err: Error, config: &ReceiverConfig) -> Self {
        let (status, error) = match &err {
            Error::Unauthorized => (config.auth_rejection_status, "Unauthorized"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
