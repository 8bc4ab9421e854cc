use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mcp_hub::backend::{backend_router, BackendState, ReferenceBackend};
use mcp_hub::observability::{init_logging, LogFormat};
use mcp_hub::service::Backend;
use mcp_hub::{NetworkConfig, NetworkModule};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Service {
    Model,
    Data,
    Execution,
}

impl Service {
    fn backend(self) -> Backend {
        match self {
            Self::Model => Backend::Model,
            Self::Data => Backend::Data,
            Self::Execution => Backend::Execution,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Model => 8002,
            Self::Data => 8003,
            Self::Execution => 8004,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "reference-backend",
    about = "In-memory model, data, or execution MCP service"
)]
struct Args {
    #[arg(long, value_enum)]
    service: Service,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Defaults to 8002, 8003, or 8004 depending on the service.
    #[arg(long)]
    port: Option<u16>,
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;

    let backend = args.service.backend();
    let port = args.port.unwrap_or_else(|| args.service.default_port());
    let mut module = NetworkModule::new(NetworkConfig::bind(args.host.clone(), port));
    module.start().await?;

    let state = BackendState {
        service: Arc::new(ReferenceBackend::in_memory(backend)),
        shutdown: module.shutdown_controller(),
    };
    info!(service = %backend, port, "reference backend ready");
    module.serve(backend_router(state), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
