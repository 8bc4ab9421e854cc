//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use crate::service::config::HubConfig;
use crate::service::dispatcher::Dispatcher;

/// The inbound service stack, cloneable per request.
pub type HubPipeline = LoadShedService<MetricsService<Dispatcher>>;

/// Build the inbound pipeline by wrapping the `Dispatcher` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded
/// 2. `MetricsLayer` -- record timing and outcome (closest to the dispatcher)
///
/// Timeouts apply per outbound dispatch in the transport, not here.
#[must_use]
pub fn build_hub_pipeline(dispatcher: Dispatcher, config: &HubConfig) -> HubPipeline {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(MetricsLayer)
        .service(dispatcher)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
