use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error taxonomy shared by the hub and the backends.
///
/// The name travels in error payloads under `kind`; the status code is the
/// default for the kind. `BackendError` passes the backend's own status
/// through instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidMessage,
    UnsupportedOperation,
    InvalidPayload,
    ValidationFailed,
    WorkerNotFound,
    StepFailed,
    DepthExceeded,
    NotFound,
    Conflict,
    BackendUnreachable,
    BackendError,
    Overloaded,
    InternalError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidMessage => "InvalidMessage",
            Self::UnsupportedOperation => "UnsupportedOperation",
            Self::InvalidPayload => "InvalidPayload",
            Self::ValidationFailed => "ValidationFailed",
            Self::WorkerNotFound => "WorkerNotFound",
            Self::StepFailed => "StepFailed",
            Self::DepthExceeded => "DepthExceeded",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::BackendUnreachable => "BackendUnreachable",
            Self::BackendError => "BackendError",
            Self::Overloaded => "Overloaded",
            Self::InternalError => "InternalError",
        }
    }

    #[must_use]
    pub fn default_status(self) -> u16 {
        match self {
            Self::InvalidMessage
            | Self::UnsupportedOperation
            | Self::InvalidPayload
            | Self::WorkerNotFound
            | Self::DepthExceeded => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ValidationFailed => 422,
            Self::BackendError => 502,
            Self::Overloaded => 503,
            Self::StepFailed | Self::BackendUnreachable | Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
