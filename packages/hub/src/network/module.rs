//! Server lifecycle with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves. Between
//! `start()` and `serve()` the caller can learn the bound port and wire the
//! shutdown controller into its router state.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    health_handler, liveness_handler, metrics_handler, process_handler, readiness_handler,
    AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Routes exposed by the hub:
///
/// - `POST /process` -- one envelope in, one envelope out
/// - `GET /health` -- hub and backend health JSON
/// - `GET /health/live` -- liveness probe
/// - `GET /health/ready` -- readiness probe
/// - `GET /metrics` -- Prometheus text
pub fn hub_router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Owns the listener and shutdown controller for one HTTP server.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared shutdown controller, for router state and probes.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves `router` behind the HTTP layers until `shutdown` resolves.
    ///
    /// After the signal the health state moves to Draining and in-flight
    /// messages get up to `drain_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        self,
        router: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = router.layer(build_http_layers(&self.config));

        self.shutdown.set_ready();
        info!("Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.shutdown.trigger_shutdown();
        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("All in-flight messages drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "Drain timeout expired with messages still in flight"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mcp_core::Envelope;
    use serde_json::{json, Value};

    use super::*;
    use crate::network::HealthState;
    use crate::service::testing::{dispatcher, request, ScriptedTransport};
    use crate::service::HubConfig;

    fn local() -> NetworkConfig {
        NetworkConfig::bind("127.0.0.1", 0)
    }

    #[test]
    fn shutdown_controller_is_shared() {
        let module = NetworkModule::new(local());
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = NetworkModule::new(local());
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let module = NetworkModule::new(local());
        let err = module
            .serve(Router::new(), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serves_process_and_drains_on_shutdown() {
        let transport = ScriptedTransport::new().respond("list_models", json!({"models": []}));
        let mut module = NetworkModule::new(local());
        let port = module.start().await.unwrap();
        let controller = module.shutdown_controller();
        let state = AppState::new(
            dispatcher(&transport),
            &HubConfig::default(),
            module.shutdown_controller(),
        );

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(hub_router(state), async move {
            let _ = stop_rx.await;
        }));

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{port}");
        let req = request("list_models", json!({}));
        let envelope: Envelope = client
            .post(format!("{base}/process"))
            .json(&req)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(envelope.request_id(), Some(req.message_id.as_str()));

        let ready = client.get(format!("{base}/health/ready")).send().await.unwrap();
        assert_eq!(ready.status(), 200);
        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}
