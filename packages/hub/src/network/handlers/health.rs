//! Health, liveness, and readiness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use futures_util::future::join_all;
use mcp_core::envelope::now_timestamp;
use serde_json::{json, Map, Value};

use super::AppState;
use crate::network::HealthState;
use crate::service::{Backend, BackendHealth};

/// Hub health with a ping of every backend.
///
/// Always returns 200. `status` is `healthy` only when every backend
/// answered its ping; `state` carries the server lifecycle state.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let transport = state.dispatcher.transport();
    let pings = join_all(Backend::ALL.iter().map(|&backend| async move {
        (backend, transport.ping(backend).await)
    }))
    .await;

    let all_healthy = pings
        .iter()
        .all(|(_, health)| *health == BackendHealth::Healthy);
    let services: Map<String, Value> = pings
        .into_iter()
        .map(|(backend, health)| (backend.name().to_string(), json!(health.as_str())))
        .collect();

    Json(json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "timestamp": now_timestamp(),
        "services": services,
        "state": state.shutdown.health_state().as_str(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe: the process is up and answering.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 only while `Ready`, 503 while starting or draining.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use mcp_core::Envelope;

    use super::*;
    use crate::network::ShutdownController;
    use crate::service::testing::{dispatcher, ScriptedTransport};
    use crate::service::{
        BackendTransport, Dispatcher, HubConfig, HubError, OperationRegistry, Orchestrator,
    };

    fn test_state() -> AppState {
        AppState::new(
            dispatcher(&ScriptedTransport::new()),
            &HubConfig::default(),
            Arc::new(ShutdownController::new()),
        )
    }

    /// Data backend down, everything else healthy.
    struct DataDown;

    #[async_trait]
    impl BackendTransport for DataDown {
        async fn send(&self, backend: Backend, _envelope: &Envelope) -> Result<Envelope, HubError> {
            Err(HubError::BackendUnreachable {
                backend,
                reason: "down".to_string(),
            })
        }

        async fn ping(&self, backend: Backend) -> BackendHealth {
            match backend {
                Backend::Data => BackendHealth::Unreachable,
                _ => BackendHealth::Healthy,
            }
        }
    }

    #[tokio::test]
    async fn reports_every_backend() {
        let state = test_state();
        state.shutdown.set_ready();

        let json = health_handler(State(state)).await.0;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["state"], "ready");
        assert_eq!(json["in_flight"], 0);
        assert!(json["timestamp"].is_string());
        for backend in Backend::ALL {
            assert_eq!(json["services"][backend.name()], "healthy");
        }
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_status() {
        let config = HubConfig::default();
        let dispatcher = Dispatcher::new(
            OperationRegistry::standard(),
            Arc::new(DataDown),
            Orchestrator::default(),
            &config,
        );
        let state = AppState::new(dispatcher, &config, Arc::new(ShutdownController::new()));

        let json = health_handler(State(state)).await.0;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["services"]["data-mcp-server"], "unreachable");
        assert_eq!(json["services"]["model-mcp-server"], "healthy");
    }

    #[tokio::test]
    async fn health_reports_in_flight_count() {
        let state = test_state();
        let _guard = state.shutdown.in_flight_guard();
        assert_eq!(health_handler(State(state)).await.0["in_flight"], 1);
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_lifecycle() {
        let state = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);

        state.shutdown.trigger_shutdown();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
