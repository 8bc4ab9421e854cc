use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mcp_hub::backend::InProcessTransport;
use mcp_hub::observability::{init_logging, init_metrics, LogFormat};
use mcp_hub::service::{
    BackendEndpoints, BackendTransport, Dispatcher, HttpTransport, HubConfig, OperationRegistry,
    Orchestrator,
};
use mcp_hub::{hub_router, AppState, NetworkConfig, NetworkModule};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "mcp-hub", about = "Routes MCP envelopes to backend services")]
struct Args {
    #[arg(long, env = "MCP_HUB_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "MCP_HUB_PORT", default_value_t = NetworkConfig::HUB_PORT)]
    port: u16,
    #[arg(long, env = "MODEL_MCP_SERVER_URL")]
    model_url: Option<String>,
    #[arg(long, env = "DATA_MCP_SERVER_URL")]
    data_url: Option<String>,
    #[arg(long, env = "EXECUTION_MCP_SERVER_URL")]
    execution_url: Option<String>,
    /// Serve every backend operation from in-memory reference backends.
    #[arg(long)]
    embedded_backends: bool,
    #[arg(long, default_value_t = 30)]
    dispatch_timeout_secs: u64,
    #[arg(long, default_value_t = 1000)]
    max_concurrent_operations: u32,
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Args {
    fn endpoints(&self) -> BackendEndpoints {
        BackendEndpoints::from_lookup(|key| match key {
            BackendEndpoints::MODEL_ENV => self.model_url.clone(),
            BackendEndpoints::DATA_ENV => self.data_url.clone(),
            BackendEndpoints::EXECUTION_ENV => self.execution_url.clone(),
            _ => None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;
    let metrics = init_metrics()?;

    let config = HubConfig {
        dispatch_timeout: Duration::from_secs(args.dispatch_timeout_secs),
        max_concurrent_operations: args.max_concurrent_operations,
        ..HubConfig::default()
    };

    let transport: Arc<dyn BackendTransport> = if args.embedded_backends {
        info!("Using embedded in-memory backends");
        Arc::new(InProcessTransport::in_memory())
    } else {
        let endpoints = args.endpoints();
        info!(
            model = %endpoints.model,
            data = %endpoints.data,
            execution = %endpoints.execution,
            "Forwarding to backend services"
        );
        Arc::new(HttpTransport::new(endpoints, &config))
    };
    let dispatcher = Dispatcher::new(
        OperationRegistry::standard(),
        transport,
        Orchestrator::default(),
        &config,
    );

    let mut module = NetworkModule::new(NetworkConfig::bind(args.host.clone(), args.port));
    let port = module.start().await?;
    let state =
        AppState::new(dispatcher, &config, module.shutdown_controller()).with_metrics(metrics);

    info!(port, "mcp-hub ready");
    module.serve(hub_router(state), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
