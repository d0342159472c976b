//! Synthetic telemetry sender for webhook-style ingestion APIs.
//!
//! Three engines do the work: [`synth`] derives plausible readings from a
//! template, [`probe`] infers endpoint and API key state from ordinary
//! requests, and [`dispatch`] submits records and reduces the outcome into
//! [`telemetry::DispatchResult`] history entries.

pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod errors;
pub mod history;
pub mod monitor;
pub mod probe;
pub mod samples;
pub mod synth;
pub mod telemetry;
pub mod transport;

pub use dispatch::Dispatcher;
pub use errors::{Error, Result};
pub use history::{History, HistorySink};
pub use monitor::ConnectionMonitor;
pub use probe::ProbeEngine;
pub use telemetry::{CredentialStatus, DispatchResult, ProbeResult, SampleEntry, TelemetryRecord};
pub use transport::{HttpTransport, ReqwestTransport};
