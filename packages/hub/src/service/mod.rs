//! Message routing and workflow orchestration.
//!
//! This module implements the hub's inbound pipeline:
//!
//! 1. **Middleware** (`middleware`): Tower layers (load shedding, metrics)
//! 2. **Dispatch** (`dispatcher`): decode, resolve via `registry`, forward or run locally
//! 3. **Transport** (`transport`): one round trip to the owning backend
//! 4. **Orchestration** (`orchestration`): composite operations built from dispatches

pub mod config;
pub mod dispatcher;
pub mod middleware;
pub mod operation;
pub mod orchestration;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenient access.
pub use config::{BackendEndpoints, HubConfig};
pub use dispatcher::Dispatcher;
pub use middleware::{build_hub_pipeline, HubPipeline};
pub use operation::{Backend, CompositeOperation, HubError};
pub use orchestration::Orchestrator;
pub use registry::{OperationRegistry, Resolution};
pub use transport::{BackendHealth, BackendTransport, HttpTransport};
