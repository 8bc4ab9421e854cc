//! HTTP surface of a reference backend: `POST /process` and `GET /health`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use mcp_core::envelope::now_timestamp;
use mcp_core::{Correlation, Envelope, ErrorKind};
use serde_json::{json, Value};

use super::service::ReferenceBackend;
use crate::network::ShutdownController;

#[derive(Clone)]
pub struct BackendState {
    pub service: Arc<ReferenceBackend>,
    pub shutdown: Arc<ShutdownController>,
}

pub fn backend_router(state: BackendState) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .with_state(state)
}

async fn process(State(state): State<BackendState>, body: Bytes) -> (StatusCode, Json<Envelope>) {
    let _guard = state.shutdown.in_flight_guard();
    match serde_json::from_slice::<Value>(&body) {
        Ok(raw) => (StatusCode::OK, Json(state.service.process(raw).await)),
        Err(e) => {
            let responses = mcp_core::ResponseBuilder::new(state.service.backend().party());
            let envelope = responses.failure(
                &Correlation::from_raw(&Value::Null),
                ErrorKind::InvalidMessage,
                format!("Invalid MCP message format: body is not JSON: {e}"),
                ErrorKind::InvalidMessage.default_status(),
            );
            (StatusCode::BAD_REQUEST, Json(envelope))
        }
    }
}

async fn health(State(state): State<BackendState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.service.backend().name(),
        "state": state.shutdown.health_state().as_str(),
        "timestamp": now_timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use mcp_core::{Party, Payload};
    use tower::ServiceExt;

    use super::*;
    use crate::service::Backend;

    fn router() -> Router {
        backend_router(BackendState {
            service: Arc::new(ReferenceBackend::in_memory(Backend::Data)),
            shutdown: Arc::new(ShutdownController::new()),
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn process_answers_with_envelope() {
        let request = Envelope::request(Party::hub(), "list_datasets", Payload::new()).unwrap();
        let response = router()
            .oneshot(
                Request::post("/process")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&request).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope = body_json(response).await;
        assert_eq!(envelope["metadata"]["request_id"], json!(request.message_id));
        assert_eq!(envelope["payload"]["datasets"], json!([]));
        assert_eq!(envelope["sender"]["id"], "data-mcp-server");
    }

    #[tokio::test]
    async fn garbage_body_is_400() {
        let response = router()
            .oneshot(Request::post("/process").body(Body::from("{{{")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["payload"]["kind"], "InvalidMessage");
    }

    #[tokio::test]
    async fn health_names_the_service() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["service"], "data-mcp-server");
    }
}
