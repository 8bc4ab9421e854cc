//! [`BackendTransport`] that calls reference backends inside the hub process.
//!
//! Envelopes still pass through their JSON form so that the wire codec is
//! exercised exactly as it would be over HTTP.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use mcp_core::Envelope;

use super::service::ReferenceBackend;
use crate::service::{Backend, BackendHealth, BackendTransport, HubError};

#[derive(Debug, Clone)]
pub struct InProcessTransport {
    model: Arc<ReferenceBackend>,
    data: Arc<ReferenceBackend>,
    execution: Arc<ReferenceBackend>,
}

impl InProcessTransport {
    #[must_use]
    pub fn new(
        model: Arc<ReferenceBackend>,
        data: Arc<ReferenceBackend>,
        execution: Arc<ReferenceBackend>,
    ) -> Self {
        Self {
            model,
            data,
            execution,
        }
    }

    /// Three backends with fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(ReferenceBackend::in_memory(Backend::Model)),
            Arc::new(ReferenceBackend::in_memory(Backend::Data)),
            Arc::new(ReferenceBackend::in_memory(Backend::Execution)),
        )
    }

    #[must_use]
    pub fn service(&self, backend: Backend) -> &Arc<ReferenceBackend> {
        match backend {
            Backend::Model => &self.model,
            Backend::Data => &self.data,
            Backend::Execution => &self.execution,
        }
    }
}

#[async_trait]
impl BackendTransport for InProcessTransport {
    async fn send(&self, backend: Backend, envelope: &Envelope) -> Result<Envelope, HubError> {
        let raw = serde_json::to_value(envelope).context("encoding envelope for in-process backend")?;
        Ok(self.service(backend).process(raw).await)
    }

    async fn ping(&self, _backend: Backend) -> BackendHealth {
        BackendHealth::Healthy
    }
}
