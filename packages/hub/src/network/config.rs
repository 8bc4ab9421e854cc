//! Network configuration for the hub and reference backend servers.

use std::time::Duration;

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Upper bound on a whole HTTP request, composite workflows included.
    pub request_timeout: Duration,
    /// How long to wait for in-flight messages after the shutdown signal.
    pub drain_timeout: Duration,
}

impl NetworkConfig {
    /// Default hub port.
    pub const HUB_PORT: u16 = 8001;

    /// Config bound to `host:port`, other fields at their defaults.
    #[must_use]
    pub fn bind(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(300),
            drain_timeout: Duration::from_secs(30),
        }
    }
}
