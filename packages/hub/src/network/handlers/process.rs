//! `POST /process`: the hub's single message endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mcp_core::{Correlation, Envelope};
use serde_json::Value;
use tower::ServiceExt;
use tracing::debug;

use super::AppState;
use crate::service::HubError;

/// Runs one envelope through the inbound pipeline.
///
/// Any JSON body gets HTTP 200 with a response envelope, failures included.
/// A body that is not JSON gets HTTP 400 with an `InvalidMessage` envelope.
/// The body is read regardless of `Content-Type`.
pub async fn process_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<Envelope>) {
    let _guard = state.shutdown.in_flight_guard();
    let responses = state.dispatcher.responses();

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "rejecting non-JSON body");
            let err = HubError::InvalidMessage {
                reason: format!("body is not JSON: {e}"),
            };
            let envelope = err.to_envelope(responses, &Correlation::from_raw(&Value::Null));
            return (StatusCode::BAD_REQUEST, Json(envelope));
        }
    };

    let request = Correlation::from_raw(&raw);
    let envelope = match state.pipeline.clone().oneshot(raw).await {
        Ok(envelope) => envelope,
        Err(err) => err.to_envelope(responses, &request),
    };
    (StatusCode::OK, Json(envelope))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mcp_core::ResponseStatus;
    use serde_json::json;

    use super::*;
    use crate::network::ShutdownController;
    use crate::service::testing::{dispatcher, request, ScriptedTransport};
    use crate::service::HubConfig;

    fn state_for(transport: &ScriptedTransport, config: &HubConfig) -> AppState {
        AppState::new(
            dispatcher(transport),
            config,
            Arc::new(ShutdownController::new()),
        )
    }

    fn body(value: &impl serde::Serialize) -> Bytes {
        Bytes::from(serde_json::to_vec(value).unwrap())
    }

    #[tokio::test]
    async fn forwards_and_answers_200() {
        let transport = ScriptedTransport::new().respond("get_model", json!({"model": {"id": "m1"}}));
        let state = state_for(&transport, &HubConfig::default());
        let req = request("get_model", json!({"model_id": "m1"}));

        let (status, Json(envelope)) = process_handler(State(state.clone()), body(&req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.request_id(), Some(req.message_id.as_str()));
        assert_eq!(envelope.payload["model"]["id"], "m1");
        assert_eq!(state.shutdown.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn error_envelopes_still_answer_200() {
        let transport = ScriptedTransport::new();
        let state = state_for(&transport, &HubConfig::default());
        let req = request("launch_rocket", json!({}));

        let (status, Json(envelope)) = process_handler(State(state), body(&req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.status, Some(ResponseStatus::Error));
        assert_eq!(envelope.payload["status_code"], 400);
    }

    #[tokio::test]
    async fn non_json_body_is_400() {
        let state = state_for(&ScriptedTransport::new(), &HubConfig::default());

        let (status, Json(envelope)) =
            process_handler(State(state), Bytes::from_static(b"not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.payload["kind"], "InvalidMessage");
        assert_eq!(envelope.request_id(), Some("unknown"));
    }

    #[tokio::test]
    async fn overload_becomes_503_envelope() {
        let config = HubConfig {
            max_concurrent_operations: 0,
            ..HubConfig::default()
        };
        let state = state_for(&ScriptedTransport::new(), &config);
        let req = request("list_models", json!({}));

        let (status, Json(envelope)) = process_handler(State(state), body(&req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.payload["status_code"], 503);
        assert_eq!(envelope.request_id(), Some(req.message_id.as_str()));
    }
}
