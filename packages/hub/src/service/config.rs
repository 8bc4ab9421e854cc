use std::time::Duration;

use mcp_core::Party;

use crate::service::operation::Backend;

/// Hub-level configuration for dispatch and orchestration.
///
/// Controls outbound timeouts, inbound concurrency, and how deeply
/// composite operations may nest.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Identity stamped as `sender` on every envelope the hub builds.
    pub identity: Party,
    /// Bound on a single forwarded dispatch round trip.
    pub dispatch_timeout: Duration,
    /// Bound on a backend health ping.
    pub health_timeout: Duration,
    /// Maximum number of inbound messages in flight before load shedding.
    pub max_concurrent_operations: u32,
    /// Maximum nesting of composite operations inside one another.
    pub max_orchestration_depth: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            identity: Party::hub(),
            dispatch_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(2),
            max_concurrent_operations: 1000,
            max_orchestration_depth: 8,
        }
    }
}

/// Base URLs of the three backend services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    pub model: String,
    pub data: String,
    pub execution: String,
}

impl BackendEndpoints {
    pub const MODEL_ENV: &'static str = "MODEL_MCP_SERVER_URL";
    pub const DATA_ENV: &'static str = "DATA_MCP_SERVER_URL";
    pub const EXECUTION_ENV: &'static str = "EXECUTION_MCP_SERVER_URL";

    /// Reads base URLs from the environment, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an injectable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let pick = |key: &str, fallback: String| {
            lookup(key)
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            model: pick(Self::MODEL_ENV, defaults.model),
            data: pick(Self::DATA_ENV, defaults.data),
            execution: pick(Self::EXECUTION_ENV, defaults.execution),
        }
    }

    #[must_use]
    pub fn url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Model => &self.model,
            Backend::Data => &self.data,
            Backend::Execution => &self.execution,
        }
    }
}

impl Default for BackendEndpoints {
    fn default() -> Self {
        Self {
            model: "http://model-mcp-server:8002".to_string(),
            data: "http://data-mcp-server:8003".to_string(),
            execution: "http://execution-mcp-server:8004".to_string(),
        }
    }
}
