use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};
use std::sync::Once;
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "receiver_requests_total",
        "Total webhook submissions received"
    ))
    .unwrap();
    pub static ref ACCEPTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "receiver_accepted_total",
        "Total submissions accepted and stored"
    ))
    .unwrap();
    pub static ref AUTH_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "receiver_auth_rejected_total",
        "Total submissions rejected for a missing or unknown API key"
    ))
    .unwrap();
    pub static ref VALIDATION_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "receiver_validation_rejected_total",
        "Total submissions rejected by payload validation"
    ))
    .unwrap();
}

static INIT: Once = Once::new();

/// Registers all counters. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
            Box::new(REQUESTS_TOTAL.clone()),
            Box::new(ACCEPTED_TOTAL.clone()),
            Box::new(AUTH_REJECTED_TOTAL.clone()),
            Box::new(VALIDATION_REJECTED_TOTAL.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                error!("Failed to register metric: {}", e);
            }
        }
    });
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
