//! Test doubles shared by the dispatcher and orchestration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_core::{Envelope, Party, Payload, ResponseBuilder};
use parking_lot::Mutex;
use serde_json::Value;

use super::config::HubConfig;
use super::dispatcher::Dispatcher;
use super::operation::{Backend, HubError};
use super::orchestration::Orchestrator;
use super::registry::OperationRegistry;
use super::transport::{BackendHealth, BackendTransport};

#[derive(Debug, Clone)]
enum Script {
    Succeed(Payload),
    Fail { message: String, status_code: u16 },
    Unreachable,
    Panic,
}

/// Transport answering from per-operation scripts and recording every call.
///
/// Unscripted operations succeed with `{"echo": <request payload>}`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    calls: Arc<Mutex<Vec<Envelope>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn script(self, operation: &str, script: Script) -> Self {
        self.scripts.lock().insert(operation.to_string(), script);
        self
    }

    pub(crate) fn respond(self, operation: &str, payload: Value) -> Self {
        let payload = payload.as_object().cloned().unwrap_or_default();
        self.script(operation, Script::Succeed(payload))
    }

    pub(crate) fn fail(self, operation: &str, message: &str, status_code: u16) -> Self {
        self.script(
            operation,
            Script::Fail {
                message: message.to_string(),
                status_code,
            },
        )
    }

    pub(crate) fn unreachable(self, operation: &str) -> Self {
        self.script(operation, Script::Unreachable)
    }

    pub(crate) fn panic_on(self, operation: &str) -> Self {
        self.script(operation, Script::Panic)
    }

    pub(crate) fn delay(self, operation: &str, delay: Duration) -> Self {
        self.delays.lock().insert(operation.to_string(), delay);
        self
    }

    /// Operation names in the order they reached the transport.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|envelope| envelope.operation.clone())
            .collect()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.requests(operation).len()
    }

    pub(crate) fn requests(&self, operation: &str) -> Vec<Envelope> {
        self.calls
            .lock()
            .iter()
            .filter(|envelope| envelope.operation == operation)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BackendTransport for ScriptedTransport {
    async fn send(&self, backend: Backend, envelope: &Envelope) -> Result<Envelope, HubError> {
        self.calls.lock().push(envelope.clone());
        let delay = self.delays.lock().get(&envelope.operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = self.scripts.lock().get(&envelope.operation).cloned();
        let responses = ResponseBuilder::new(backend.party());
        let request = envelope.correlation();
        match script {
            Some(Script::Succeed(payload)) => Ok(responses.success(&request, payload)),
            Some(Script::Fail {
                message,
                status_code,
            }) => Ok(responses.error(&request, message, status_code)),
            Some(Script::Unreachable) => Err(HubError::BackendUnreachable {
                backend,
                reason: "connection refused".to_string(),
            }),
            Some(Script::Panic) => panic!("scripted panic in {}", envelope.operation),
            None => {
                let mut payload = Payload::new();
                payload.insert("echo".to_string(), Value::Object(envelope.payload.clone()));
                Ok(responses.success(&request, payload))
            }
        }
    }

    async fn ping(&self, _backend: Backend) -> BackendHealth {
        BackendHealth::Healthy
    }
}

pub(crate) fn dispatcher(transport: &ScriptedTransport) -> Dispatcher {
    dispatcher_with(transport, Orchestrator::default())
}

pub(crate) fn dispatcher_with(
    transport: &ScriptedTransport,
    orchestrator: Orchestrator,
) -> Dispatcher {
    Dispatcher::new(
        OperationRegistry::standard(),
        Arc::new(transport.clone()),
        orchestrator,
        &HubConfig::default(),
    )
}

/// Request from an external caller.
pub(crate) fn request(operation: &str, payload: Value) -> Envelope {
    Envelope::request(
        Party::new("api-gateway", "gateway"),
        operation,
        payload.as_object().cloned().unwrap_or_default(),
    )
    .unwrap()
}

pub(crate) fn object(value: Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}
