//! MCP Hub: routes envelope messages to backend services and runs
//! multi-step workflows over them.

pub mod backend;
pub mod network;
pub mod observability;
pub mod service;

pub use network::{hub_router, AppState, NetworkConfig, NetworkModule};
pub use service::{Dispatcher, HubConfig, HubError};
