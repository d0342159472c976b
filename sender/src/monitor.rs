//! Keeps reachability and credential state current as configuration changes.

use crate::debounce::Debouncer;
use crate::probe::ProbeEngine;
use crate::telemetry::{CredentialStatus, ProbeResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

type ProbeJob = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Inputs {
    endpoint: String,
    credential: String,
}

/// Owns the probe state. Input changes are debounced, `test_now` is not.
///
/// Each probe run publishes `Checking` and then its result. A run that is
/// superseded by a newer one is cancelled and publishes nothing further, so
/// the channels always reflect the most recent completed probe.
pub struct ConnectionMonitor {
    engine: ProbeEngine,
    inputs: Mutex<Option<Inputs>>,
    reachability_tx: Arc<watch::Sender<ProbeResult>>,
    credential_tx: Arc<watch::Sender<CredentialStatus>>,
    reachability_jobs: Debouncer<String>,
    credential_jobs: Debouncer<(String, String)>,
}

impl ConnectionMonitor {
    pub fn new(engine: ProbeEngine, quiet: Duration) -> Self {
        let (reachability_tx, _) = watch::channel(ProbeResult::Checking);
        let (credential_tx, _) = watch::channel(CredentialStatus::Checking);
        Self {
            engine,
            inputs: Mutex::new(None),
            reachability_tx: Arc::new(reachability_tx),
            credential_tx: Arc::new(credential_tx),
            reachability_jobs: Debouncer::new(quiet),
            credential_jobs: Debouncer::new(quiet),
        }
    }

    pub fn reachability(&self) -> watch::Receiver<ProbeResult> {
        self.reachability_tx.subscribe()
    }

    pub fn credential(&self) -> watch::Receiver<CredentialStatus> {
        self.credential_tx.subscribe()
    }

    pub fn current(&self) -> (ProbeResult, CredentialStatus) {
        (
            self.reachability_tx.borrow().clone(),
            self.credential_tx.borrow().clone(),
        )
    }

    /// Records new inputs and schedules the probes whose governing inputs
    /// changed: reachability on endpoint, credential on endpoint or key.
    pub fn update(&self, endpoint: &str, credential: &str) {
        let next = Inputs {
            endpoint: endpoint.to_string(),
            credential: credential.to_string(),
        };
        let previous = {
            let mut inputs = self.inputs.lock().unwrap_or_else(|p| p.into_inner());
            inputs.replace(next.clone())
        };

        let endpoint_changed = previous
            .as_ref()
            .map_or(true, |p| p.endpoint != next.endpoint);
        let credential_changed = previous.as_ref().map_or(true, |p| p != &next);

        if endpoint_changed {
            debug!("Endpoint changed, scheduling reachability probe");
            let job = self.reachability_job(next.endpoint.clone());
            self.reachability_jobs.schedule(next.endpoint.clone(), job);
        }
        if credential_changed {
            debug!("Endpoint or key changed, scheduling credential probe");
            let job = self.credential_job(next.endpoint.clone(), next.credential.clone());
            self.credential_jobs
                .schedule((next.endpoint, next.credential), job);
        }
    }

    /// Re-runs both probes immediately with the last inputs
    pub fn test_now(&self) {
        let inputs = self
            .inputs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .unwrap_or_default();

        let job = self.reachability_job(inputs.endpoint.clone());
        self.reachability_jobs.trigger(inputs.endpoint.clone(), job);

        let job = self.credential_job(inputs.endpoint.clone(), inputs.credential.clone());
        self.credential_jobs
            .trigger((inputs.endpoint, inputs.credential), job);
    }

    /// True while either check is waiting out its quiet period
    pub fn is_settling(&self) -> bool {
        self.reachability_jobs.is_waiting() || self.credential_jobs.is_waiting()
    }

    /// Drops scheduled and in-flight checks, leaving the last results in place
    pub fn cancel_pending(&self) {
        self.reachability_jobs.cancel();
        self.credential_jobs.cancel();
    }

    fn reachability_job(
        &self,
        endpoint: String,
    ) -> impl FnOnce() -> ProbeJob + Send + 'static {
        let engine = self.engine.clone();
        let tx = self.reachability_tx.clone();
        move || -> ProbeJob {
            Box::pin(async move {
                tx.send_replace(ProbeResult::Checking);
                let result = engine.probe_reachability(&endpoint).await;
                tx.send_replace(result);
            })
        }
    }

    fn credential_job(
        &self,
        endpoint: String,
        credential: String,
    ) -> impl FnOnce() -> ProbeJob + Send + 'static {
        let engine = self.engine.clone();
        let tx = self.credential_tx.clone();
        move || -> ProbeJob {
            Box::pin(async move {
                tx.send_replace(CredentialStatus::Checking);
                let status = engine.probe_credential(&endpoint, &credential).await;
                tx.send_replace(status);
            })
        }
    }
}
