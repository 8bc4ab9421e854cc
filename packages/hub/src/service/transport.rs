//! Outbound leg of a forwarded dispatch.
//!
//! [`BackendTransport`] is the seam between the dispatcher and the network:
//! the hub ships [`HttpTransport`], while tests and single-process
//! deployments substitute an in-process implementation.

use std::time::Duration;

use async_trait::async_trait;
use mcp_core::Envelope;
use tracing::warn;

use super::config::{BackendEndpoints, HubConfig};
use super::operation::{Backend, HubError};

// ---------------------------------------------------------------------------
// BackendHealth
// ---------------------------------------------------------------------------

/// Outcome of a health ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendHealth {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl BackendHealth {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unreachable => "unreachable",
        }
    }
}

// ---------------------------------------------------------------------------
// BackendTransport
// ---------------------------------------------------------------------------

/// Carries one envelope to a backend and returns its response envelope.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Performs exactly one round trip to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::BackendUnreachable`] when the backend cannot be
    /// reached in time and [`HubError::BackendError`] when it answers with a
    /// failure status or an unreadable body.
    async fn send(&self, backend: Backend, envelope: &Envelope) -> Result<Envelope, HubError>;

    /// Liveness probe; never fails, unreachable backends report as such.
    async fn ping(&self, backend: Backend) -> BackendHealth;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Sends envelopes as JSON to `POST {base}/process`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: BackendEndpoints,
    dispatch_timeout: Duration,
    health_timeout: Duration,
}

impl HttpTransport {
    #[must_use]
    pub fn new(endpoints: BackendEndpoints, config: &HubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            dispatch_timeout: config.dispatch_timeout,
            health_timeout: config.health_timeout,
        }
    }

    fn url(&self, backend: Backend, path: &str) -> String {
        format!(
            "{}/{path}",
            self.endpoints.url(backend).trim_end_matches('/')
        )
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn send(&self, backend: Backend, envelope: &Envelope) -> Result<Envelope, HubError> {
        let response = self
            .client
            .post(self.url(backend, "process"))
            .timeout(self.dispatch_timeout)
            .json(envelope)
            .send()
            .await
            .map_err(|e| unreachable(backend, envelope, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) if e.is_timeout() => return Err(unreachable(backend, envelope, &e)),
                Err(e) => {
                    warn!(%backend, error = %e, "failed to read backend error body");
                    format!("unreadable response body: {e}")
                }
            };
            warn!(%backend, status = status.as_u16(), "backend returned failure status");
            return Err(HubError::BackendError {
                backend,
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Envelope>().await.map_err(|e| {
            if e.is_timeout() {
                unreachable(backend, envelope, &e)
            } else {
                HubError::BackendError {
                    backend,
                    status: 502,
                    body: format!("invalid response envelope: {e}"),
                }
            }
        })
    }

    async fn ping(&self, backend: Backend) -> BackendHealth {
        match self
            .client
            .get(self.url(backend, "health"))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => BackendHealth::Healthy,
            Ok(_) => BackendHealth::Unhealthy,
            Err(_) => BackendHealth::Unreachable,
        }
    }
}

/// Connect failures and timeouts, whether before the headers or mid-body.
fn unreachable(backend: Backend, envelope: &Envelope, e: &reqwest::Error) -> HubError {
    warn!(%backend, operation = %envelope.operation, error = %e, "backend unreachable");
    HubError::BackendUnreachable {
        backend,
        reason: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
