use axum::http::StatusCode;
use receiver::errors::{Error, Result};
use receiver::metrics;
use receiver::{create_router, ReadingStore, ReceiverConfig};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let store_capacity: usize = env::var("STORE_CAPACITY")
        .unwrap_or_else(|_| "10000".to_string())
        .parse()
        .unwrap_or(10000);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting mock webhook receiver");
    info!("HTTP server: {}", http_addr);
    info!("Webhook path: {}", config.webhook_path);
    info!(
        "{} API key(s) configured, auth failures answer {}",
        config.api_keys.len(),
        config.auth_rejection_status
    );

    metrics::init_metrics();

    let store = Arc::new(ReadingStore::new(store_capacity));
    let app = create_router(config, store);

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

fn load_config() -> Result<ReceiverConfig> {
    let defaults = ReceiverConfig::default();

    let webhook_path = env::var("WEBHOOK_PATH").unwrap_or(defaults.webhook_path);
    if !webhook_path.starts_with('/') {
        return Err(Error::Config(format!(
            "WEBHOOK_PATH must start with '/': {}",
            webhook_path
        )));
    }

    let api_keys = match env::var("API_KEYS") {
        Ok(keys) => keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => defaults.api_keys,
    };

    let auth_rejection_status = match env::var("AUTH_REJECTION_STATUS").as_deref() {
        Ok("400") => StatusCode::BAD_REQUEST,
        Ok("401") | Err(_) => StatusCode::UNAUTHORIZED,
        Ok(other) => {
            return Err(Error::Config(format!(
                "AUTH_REJECTION_STATUS must be 400 or 401, got {}",
                other
            )))
        }
    };

    Ok(ReceiverConfig {
        webhook_path,
        api_keys,
        auth_rejection_status,
    })
}
