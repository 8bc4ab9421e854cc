//! Resolves an operation and either forwards it or runs it locally.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use mcp_core::{Correlation, Envelope, ResponseBuilder};
use serde_json::Value;
use tower::Service;
use tracing::{debug, error, info};

use super::config::HubConfig;
use super::operation::HubError;
use super::orchestration::Orchestrator;
use super::registry::{OperationRegistry, Resolution};
use super::transport::BackendTransport;

type EnvelopeFuture<'a> = Pin<Box<dyn Future<Output = Envelope> + Send + 'a>>;

struct DispatcherInner {
    registry: OperationRegistry,
    transport: Arc<dyn BackendTransport>,
    orchestrator: Orchestrator,
    responses: ResponseBuilder,
    max_depth: usize,
}

/// Entry point of every message the hub handles.
///
/// Always produces a complete envelope: resolution failures, transport
/// failures, orchestration errors, and panics all become error responses
/// correlated to the request that caused them. Cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("operations", &self.inner.registry.len())
            .field("max_depth", &self.inner.max_depth)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: OperationRegistry,
        transport: Arc<dyn BackendTransport>,
        orchestrator: Orchestrator,
        config: &HubConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                transport,
                orchestrator,
                responses: ResponseBuilder::new(config.identity.clone()),
                max_depth: config.max_orchestration_depth,
            }),
        }
    }

    #[must_use]
    pub fn responses(&self) -> &ResponseBuilder {
        &self.inner.responses
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn BackendTransport> {
        &self.inner.transport
    }

    /// Handles an externally sourced message that has not been decoded yet.
    pub async fn process(&self, raw: Value) -> Envelope {
        let request = Correlation::from_raw(&raw);
        match Envelope::decode(raw) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(e) => {
                info!(message_id = %request.message_id, error = %e, "rejected invalid message");
                HubError::InvalidMessage {
                    reason: e.to_string(),
                }
                .to_envelope(&self.inner.responses, &request)
            }
        }
    }

    /// Dispatches a decoded request envelope.
    pub async fn dispatch(&self, envelope: Envelope) -> Envelope {
        self.dispatch_at(envelope, 0).await
    }

    /// Dispatch at a given orchestration nesting depth.
    ///
    /// Boxed so that orchestration handlers can recurse into it.
    pub(crate) fn dispatch_at(&self, envelope: Envelope, depth: usize) -> EnvelopeFuture<'_> {
        Box::pin(async move {
            let request = envelope.correlation();
            match AssertUnwindSafe(self.route(envelope, depth))
                .catch_unwind()
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => err.to_envelope(&self.inner.responses, &request),
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(operation = %request.operation, %reason, "dispatch panicked");
                    HubError::Internal(anyhow::anyhow!(reason))
                        .to_envelope(&self.inner.responses, &request)
                }
            }
        })
    }

    async fn route(&self, mut envelope: Envelope, depth: usize) -> Result<Envelope, HubError> {
        match self.inner.registry.resolve(&envelope.operation)? {
            Resolution::Local(composite) => {
                if depth >= self.inner.max_depth {
                    return Err(HubError::DepthExceeded {
                        limit: self.inner.max_depth,
                    });
                }
                debug!(operation = %composite, depth, "running composite operation");
                self.inner
                    .orchestrator
                    .handle(self, composite, envelope, depth + 1)
                    .await
            }
            Resolution::Backend(backend) => {
                info!(operation = %envelope.operation, %backend, "forwarding");
                envelope.recipient = Some(backend.party());
                self.inner.transport.send(backend, &envelope).await
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// tower::Service
// ---------------------------------------------------------------------------

impl Service<Value> for Dispatcher {
    type Response = Envelope;
    type Error = HubError;
    type Future = Pin<Box<dyn Future<Output = Result<Envelope, HubError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, raw: Value) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.process(raw).await) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use mcp_core::{MessageKind, Party, ResponseStatus};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::Backend;
    use crate::service::testing::{dispatcher, request, ScriptedTransport};

    #[tokio::test]
    async fn forwards_and_returns_backend_envelope() {
        let transport = ScriptedTransport::new()
            .respond("get_model", json!({"model": {"id": "m1", "name": "x"}}));
        let hub = dispatcher(&transport);

        let req = request("get_model", json!({"model_id": "m1"}));
        let resp = hub.dispatch(req.clone()).await;

        assert_eq!(resp.status, Some(ResponseStatus::Success));
        assert_eq!(resp.sender, Backend::Model.party());
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
        assert_eq!(resp.payload["model"]["id"], "m1");

        let sent = transport.requests("get_model");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, Some(Backend::Model.party()));
        assert_eq!(sent[0].payload["model_id"], "m1");
    }

    #[tokio::test]
    async fn unsupported_operation_is_400_regardless_of_payload() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        for payload in [json!({}), json!({"operations": [{"operation": "list_models"}]})] {
            let req = request("train_model", payload);
            let resp = hub.dispatch(req.clone()).await;
            assert!(resp.is_error());
            assert_eq!(resp.payload["status_code"], 400);
            assert_eq!(resp.payload["kind"], "UnsupportedOperation");
            assert_eq!(resp.error_message(), Some("Unsupported operation: train_model"));
            assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_raw_message_is_400_with_best_effort_correlation() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let resp = hub
            .process(json!({
                "message_id": "abc",
                "operation": "get_model",
                "sender": {"id": "api-gateway", "type": "gateway"}
            }))
            .await;
        assert!(resp.is_error());
        assert_eq!(resp.payload["status_code"], 400);
        assert_eq!(resp.payload["kind"], "InvalidMessage");
        assert_eq!(resp.request_id(), Some("abc"));
        assert_eq!(resp.recipient, Some(Party::new("api-gateway", "gateway")));
        assert_eq!(resp.message_type, MessageKind::Response);

        let resp = hub.process(json!("not an object")).await;
        assert_eq!(resp.request_id(), Some("unknown"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_operation_is_unsupported() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let mut req = request("list_models", json!({}));
        req.operation = String::new();
        let resp = hub.dispatch(req).await;
        assert_eq!(resp.payload["kind"], "UnsupportedOperation");
        assert_eq!(resp.payload["status_code"], 400);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn present_but_empty_fields_still_forward() {
        let transport =
            ScriptedTransport::new().respond("list_models", json!({"models": []}));
        let hub = dispatcher(&transport);

        let mut raw = serde_json::to_value(request("list_models", json!({}))).unwrap();
        raw["timestamp"] = json!("");
        raw["mcp_version"] = json!("");
        raw["sender"]["id"] = json!("");
        let resp = hub.process(raw).await;
        assert_eq!(resp.status, Some(ResponseStatus::Success));
        assert_eq!(resp.payload["models"], json!([]));
        assert_eq!(transport.calls(), vec!["list_models".to_string()]);
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_envelope() {
        let transport = ScriptedTransport::new().unreachable("list_datasets");
        let hub = dispatcher(&transport);

        let req = request("list_datasets", json!({}));
        let resp = hub.dispatch(req.clone()).await;
        assert!(resp.is_error());
        assert_eq!(resp.payload["kind"], "BackendUnreachable");
        assert_eq!(resp.payload["backend"], "data-mcp-server");
        assert_eq!(resp.payload["status_code"], 500);
        assert_eq!(resp.sender, Party::hub());
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
    }

    #[tokio::test]
    async fn panic_is_internal_error() {
        let transport = ScriptedTransport::new().panic_on("list_models");
        let hub = dispatcher(&transport);

        let resp = hub.dispatch(request("list_models", json!({}))).await;
        assert_eq!(resp.payload["kind"], "InternalError");
        assert_eq!(resp.payload["status_code"], 500);
        assert!(resp
            .error_message()
            .unwrap()
            .starts_with("Internal server error:"));
    }

    #[tokio::test]
    async fn nesting_beyond_limit_is_rejected() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        // Each level wraps the previous one in a single-step chain.
        let mut payload = json!({"operations": [{"operation": "list_models"}]});
        for _ in 0..HubConfig::default().max_orchestration_depth {
            payload = json!({"operations": [{"operation": "chain_operations", "payload": payload}]});
        }
        let resp = hub.dispatch(request("chain_operations", payload)).await;

        assert!(resp.is_error());
        assert_eq!(resp.payload["kind"], "DepthExceeded");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn service_call_processes_raw_json() {
        let transport = ScriptedTransport::new();
        let hub = dispatcher(&transport);

        let req = request("list_models", json!({}));
        let raw = serde_json::to_value(&req).unwrap();
        let resp = hub.oneshot(raw).await.unwrap();
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
        assert_eq!(transport.calls(), vec!["list_models"]);
    }
}
