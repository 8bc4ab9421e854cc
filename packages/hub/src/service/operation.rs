//! Routing vocabulary: backends, composite operations, and the hub's error type.

use std::fmt;

use mcp_core::operations as ops;
use mcp_core::{Correlation, Envelope, ErrorKind, Party, ResponseBuilder};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A CRUD backend service owning a subset of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Model,
    Data,
    Execution,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Model, Backend::Data, Backend::Execution];

    /// Service name, also used as the backend's envelope identity.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model-mcp-server",
            Self::Data => "data-mcp-server",
            Self::Execution => "execution-mcp-server",
        }
    }

    #[must_use]
    pub fn party(self) -> Party {
        Party::service(self.name())
    }

    /// Operations this backend owns in the standard routing table.
    #[must_use]
    pub fn operations(self) -> &'static [&'static str] {
        match self {
            Self::Model => &ops::MODEL_OPERATIONS,
            Self::Data => &ops::DATA_OPERATIONS,
            Self::Execution => &ops::EXECUTION_OPERATIONS,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// CompositeOperation
// ---------------------------------------------------------------------------

/// Operations the hub runs itself instead of forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeOperation {
    ChainOperations,
    ValidateAndExecute,
    RouteRequest,
    ParallelExecute,
    OrchestrateTask,
    EvaluateAndOptimize,
}

impl CompositeOperation {
    pub const ALL: [CompositeOperation; 6] = [
        CompositeOperation::ChainOperations,
        CompositeOperation::ValidateAndExecute,
        CompositeOperation::RouteRequest,
        CompositeOperation::ParallelExecute,
        CompositeOperation::OrchestrateTask,
        CompositeOperation::EvaluateAndOptimize,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ChainOperations => ops::CHAIN_OPERATIONS,
            Self::ValidateAndExecute => ops::VALIDATE_AND_EXECUTE,
            Self::RouteRequest => ops::ROUTE_REQUEST,
            Self::ParallelExecute => ops::PARALLEL_EXECUTE,
            Self::OrchestrateTask => ops::ORCHESTRATE_TASK,
            Self::EvaluateAndOptimize => ops::EVALUATE_AND_OPTIMIZE,
        }
    }
}

impl fmt::Display for CompositeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// HubError
// ---------------------------------------------------------------------------

/// Errors raised while dispatching or orchestrating.
///
/// Never leaves the hub as-is: the dispatcher converts every error into an
/// error envelope with [`HubError::to_envelope`].
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Invalid MCP message format: {reason}")]
    InvalidMessage { reason: String },
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },
    #[error("{0}")]
    InvalidPayload(String),
    #[error("Validation failed")]
    ValidationFailed,
    #[error("No worker found for role: {role}")]
    WorkerNotFound { role: String },
    #[error("Step {step} failed: {message}")]
    StepFailed { step: i64, message: String },
    #[error("orchestration nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("{backend} unreachable: {reason}")]
    BackendUnreachable { backend: Backend, reason: String },
    #[error("Error from {backend}: {body}")]
    BackendError {
        backend: Backend,
        status: u16,
        body: String,
    },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HubError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMessage { .. } => ErrorKind::InvalidMessage,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::ValidationFailed => ErrorKind::ValidationFailed,
            Self::WorkerNotFound { .. } => ErrorKind::WorkerNotFound,
            Self::StepFailed { .. } => ErrorKind::StepFailed,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::BackendUnreachable { .. } => ErrorKind::BackendUnreachable,
            Self::BackendError { .. } => ErrorKind::BackendError,
            Self::Overloaded => ErrorKind::Overloaded,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Status code reported in the error payload.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BackendError { status, .. } => *status,
            other => other.kind().default_status(),
        }
    }

    /// Builds the error envelope answering `request`.
    #[must_use]
    pub fn to_envelope(&self, responses: &ResponseBuilder, request: &Correlation) -> Envelope {
        let mut envelope =
            responses.failure(request, self.kind(), self.to_string(), self.status_code());
        match self {
            Self::StepFailed { step, .. } => {
                envelope.payload.insert("step".to_string(), (*step).into());
            }
            Self::BackendUnreachable { backend, .. } | Self::BackendError { backend, .. } => {
                envelope
                    .payload
                    .insert("backend".to_string(), backend.name().into());
            }
            _ => {}
        }
        envelope
    }
}
