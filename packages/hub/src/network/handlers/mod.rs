//! HTTP handlers for the hub server.
//!
//! Defines `AppState` (the shared state carried through axum extractors)
//! and re-exports the handler functions used to build the router.

pub mod health;
pub mod metrics;
pub mod process;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use metrics::metrics_handler;
pub use process::process_handler;

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use super::ShutdownController;
use crate::service::{build_hub_pipeline, Dispatcher, HubConfig, HubPipeline};

/// Shared state passed to all hub handlers via `State` extraction.
///
/// Cloning is cheap: the pipeline and dispatcher share their internals.
#[derive(Clone)]
pub struct AppState {
    /// Inbound message pipeline (load shedding, metrics, dispatch).
    pub pipeline: HubPipeline,
    /// The dispatcher behind the pipeline, used for health pings and
    /// building error envelopes outside the pipeline.
    pub dispatcher: Dispatcher,
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
    /// Prometheus handle when a recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, config: &HubConfig, shutdown: Arc<ShutdownController>) -> Self {
        Self {
            pipeline: build_hub_pipeline(dispatcher.clone(), config),
            dispatcher,
            shutdown,
            start_time: Instant::now(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
