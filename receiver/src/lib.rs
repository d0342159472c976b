//! Local stand-in for a tracker webhook ingestion API.

pub mod errors;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod store;
pub mod validate;

pub use rest::{create_router, ReceiverConfig, SERVICE_NAME};
pub use store::ReadingStore;
