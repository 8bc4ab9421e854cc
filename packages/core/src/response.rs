//! Response construction shared by the hub and the backends.
//!
//! Every response, successful or not, is built here so that correlation
//! (`metadata.request_id`) and the error payload shape (`{error,
//! status_code}`) are identical regardless of which component failed.

use serde_json::Value;

use crate::envelope::{
    fresh_message_id, now_timestamp, Correlation, Envelope, MessageKind, Metadata, Party,
    Payload, ResponseStatus, MCP_VERSION,
};
use crate::error::ErrorKind;

/// Builds response envelopes on behalf of a fixed sender identity.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    sender: Party,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new(sender: Party) -> Self {
        Self { sender }
    }

    /// Builder that answers as the hub.
    #[must_use]
    pub fn hub() -> Self {
        Self::new(Party::hub())
    }

    #[must_use]
    pub fn sender(&self) -> &Party {
        &self.sender
    }

    /// Builds a response answering `request`.
    #[must_use]
    pub fn respond(
        &self,
        request: &Correlation,
        payload: Payload,
        status: ResponseStatus,
    ) -> Envelope {
        let mut metadata = Metadata::new();
        metadata.insert(
            "request_id".to_string(),
            Value::String(request.message_id.clone()),
        );
        Envelope {
            mcp_version: MCP_VERSION.to_string(),
            message_id: fresh_message_id(),
            timestamp: now_timestamp(),
            sender: self.sender.clone(),
            recipient: Some(request.sender.clone().unwrap_or_else(Party::unknown)),
            message_type: MessageKind::Response,
            operation: request.operation.clone(),
            payload,
            status: Some(status),
            metadata,
        }
    }

    #[must_use]
    pub fn success(&self, request: &Correlation, payload: Payload) -> Envelope {
        self.respond(request, payload, ResponseStatus::Success)
    }

    /// Error response with the bare `{error, status_code}` payload.
    #[must_use]
    pub fn error(
        &self,
        request: &Correlation,
        message: impl Into<String>,
        status_code: u16,
    ) -> Envelope {
        self.respond(
            request,
            error_payload(message.into(), status_code),
            ResponseStatus::Error,
        )
    }

    /// Error response that also names the error kind.
    #[must_use]
    pub fn failure(
        &self,
        request: &Correlation,
        kind: ErrorKind,
        message: impl Into<String>,
        status_code: u16,
    ) -> Envelope {
        let mut payload = error_payload(message.into(), status_code);
        payload.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
        self.respond(request, payload, ResponseStatus::Error)
    }

    /// Copies a nested response's status and payload verbatim into a
    /// response that answers `request`.
    #[must_use]
    pub fn relay(&self, request: &Correlation, nested: &Envelope) -> Envelope {
        let status = nested.status.unwrap_or(ResponseStatus::Success);
        let mut envelope = self.respond(request, nested.payload.clone(), status);
        envelope.metadata.insert(
            "relayed_from".to_string(),
            Value::String(nested.operation.clone()),
        );
        envelope
    }
}

fn error_payload(message: String, status_code: u16) -> Payload {
    let mut payload = Payload::new();
    payload.insert("error".to_string(), Value::String(message));
    payload.insert("status_code".to_string(), Value::from(status_code));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Envelope {
        Envelope::request(Party::service("api-gateway"), "get_model", Payload::new()).unwrap()
    }

    #[test]
    fn response_points_back_at_request() {
        let req = request();
        let resp = ResponseBuilder::hub().success(&req.correlation(), Payload::new());
        assert_eq!(resp.request_id(), Some(req.message_id.as_str()));
        assert_eq!(resp.message_type, MessageKind::Response);
        assert_eq!(resp.status, Some(ResponseStatus::Success));
        assert_eq!(resp.sender, Party::hub());
        assert_eq!(resp.recipient, Some(Party::service("api-gateway")));
        assert_eq!(resp.operation, "get_model");
        assert_ne!(resp.message_id, req.message_id);
    }

    #[test]
    fn error_payload_carries_message_and_status_code() {
        let req = request();
        let resp = ResponseBuilder::hub().error(&req.correlation(), "boom", 418);
        assert!(resp.is_error());
        assert_eq!(resp.error_message(), Some("boom"));
        assert_eq!(resp.payload["status_code"], 418);
        assert!(resp.payload.get("kind").is_none());
    }

    #[test]
    fn failure_names_the_kind() {
        let req = request();
        let resp = ResponseBuilder::hub().failure(
            &req.correlation(),
            ErrorKind::ValidationFailed,
            "Validation failed",
            422,
        );
        assert_eq!(resp.payload["kind"], "ValidationFailed");
        assert_eq!(resp.payload["status_code"], 422);
    }

    #[test]
    fn unknown_sender_is_addressed_as_unknown() {
        let corr = Correlation::from_raw(&Value::Null);
        let resp = ResponseBuilder::hub().error(&corr, "bad", 400);
        assert_eq!(resp.recipient, Some(Party::unknown()));
        assert_eq!(resp.request_id(), Some("unknown"));
    }

    #[test]
    fn relay_keeps_payload_and_status_but_recorrelates() {
        let outer = request();
        let inner = Envelope::request(Party::hub(), "create_execution", Payload::new()).unwrap();
        let nested = ResponseBuilder::new(Party::service("execution-mcp-server")).error(
            &inner.correlation(),
            "no capacity",
            503,
        );

        let relayed = ResponseBuilder::hub().relay(&outer.correlation(), &nested);
        assert_eq!(relayed.payload, nested.payload);
        assert_eq!(relayed.status, Some(ResponseStatus::Error));
        assert_eq!(relayed.request_id(), Some(outer.message_id.as_str()));
        assert_eq!(relayed.metadata["relayed_from"], "create_execution");
    }
}
