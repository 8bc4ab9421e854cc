//! The MCP message envelope exchanged between the hub and every backend.
//!
//! Field names are snake_case on the wire. Inbound messages are checked for
//! key presence with [`validate`] before they are decoded into an
//! [`Envelope`]; envelopes built locally through [`Envelope::request`] are
//! trusted by construction.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Protocol version stamped on every envelope.
pub const MCP_VERSION: &str = "1.0";

/// Identity used by the hub when it sends or answers messages.
pub const HUB_ID: &str = "mcp-hub";

/// Keys that must be present on every inbound envelope.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "mcp_version",
    "message_id",
    "timestamp",
    "sender",
    "message_type",
    "operation",
];

/// Operation-specific body of an envelope.
pub type Payload = Map<String, Value>;

/// Free-form envelope metadata. Responses always carry `request_id`.
pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Null-tolerant map helper
// ---------------------------------------------------------------------------

/// Deserializes an object field that peers may send as `null` or omit.
///
/// Both cases collapse to an empty map so handlers never branch on them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Direction of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
}

/// Outcome carried by response envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl ResponseStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Party
// ---------------------------------------------------------------------------

/// Sender or recipient identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Party {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }

    /// A service identity, where id and type are the same name.
    #[must_use]
    pub fn service(name: &str) -> Self {
        Self::new(name, name)
    }

    /// The hub's own identity.
    #[must_use]
    pub fn hub() -> Self {
        Self::service(HUB_ID)
    }

    /// Placeholder used when a peer did not identify itself.
    #[must_use]
    pub fn unknown() -> Self {
        Self::service("unknown")
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons an envelope cannot be built or decoded.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("operation must be a non-empty string")]
    EmptyOperation,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The unit of communication between all services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub mcp_version: String,
    pub message_id: String,
    pub timestamp: String,
    pub sender: Party,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recipient: Option<Party>,
    pub message_type: MessageKind,
    pub operation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<ResponseStatus>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Metadata,
}

impl Envelope {
    /// Builds a fresh request envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyOperation`] if `operation` is empty.
    pub fn request(
        sender: Party,
        operation: impl Into<String>,
        payload: Payload,
    ) -> Result<Self, EnvelopeError> {
        let operation = operation.into();
        if operation.is_empty() {
            return Err(EnvelopeError::EmptyOperation);
        }
        Ok(Self {
            mcp_version: MCP_VERSION.to_string(),
            message_id: fresh_message_id(),
            timestamp: now_timestamp(),
            sender,
            recipient: None,
            message_type: MessageKind::Request,
            operation,
            payload,
            status: None,
            metadata: Metadata::new(),
        })
    }

    /// Checks presence and shape of a raw message, then decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingFields`] when [`validate`] fails and
    /// [`EnvelopeError::Malformed`] when a present field has the wrong shape.
    pub fn decode(raw: Value) -> Result<Self, EnvelopeError> {
        let missing = missing_fields(&raw);
        if !missing.is_empty() {
            return Err(EnvelopeError::MissingFields(missing));
        }
        Ok(serde_json::from_value(raw)?)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == Some(ResponseStatus::Error)
    }

    /// `metadata.request_id`, present on every response.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.metadata.get("request_id").and_then(Value::as_str)
    }

    /// `payload.error` of an error response.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }

    /// The fields a response needs to point back at this message.
    #[must_use]
    pub fn correlation(&self) -> Correlation {
        Correlation {
            message_id: self.message_id.clone(),
            operation: self.operation.clone(),
            sender: Some(self.sender.clone()),
        }
    }
}

/// Returns `true` when every key in [`REQUIRED_FIELDS`] is present.
#[must_use]
pub fn validate(raw: &Value) -> bool {
    missing_fields(raw).is_empty()
}

/// Lists required keys absent from a raw message. A non-object misses all.
#[must_use]
pub fn missing_fields(raw: &Value) -> Vec<&'static str> {
    match raw.as_object() {
        Some(obj) => REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !obj.contains_key(*field))
            .collect(),
        None => REQUIRED_FIELDS.to_vec(),
    }
}

/// Best-effort operation name of a raw message, for logging.
#[must_use]
pub fn operation_of(raw: &Value) -> &str {
    raw.get("operation")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

#[must_use]
pub fn fresh_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current UTC time in RFC 3339 with microsecond precision.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// What a response needs to know about the request it answers.
///
/// Built from a typed [`Envelope`] or, for messages that failed decoding,
/// from whatever the raw JSON offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub message_id: String,
    pub operation: String,
    pub sender: Option<Party>,
}

impl Correlation {
    #[must_use]
    pub fn from_raw(raw: &Value) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };
        Self {
            message_id: text("message_id"),
            operation: text("operation"),
            sender: raw
                .get("sender")
                .cloned()
                .and_then(|s| serde_json::from_value(s).ok()),
        }
    }
}

impl From<&Envelope> for Correlation {
    fn from(envelope: &Envelope) -> Self {
        envelope.correlation()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
