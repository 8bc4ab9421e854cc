//! Reference backend services.
//!
//! In-memory implementations of the model, data, and execution services
//! that speak the same envelope protocol as production backends. Used by the
//! `reference-backend` binary, by `mcp-hub --embedded-backends`, and by the
//! end-to-end tests.

pub mod in_process;
pub mod resource;
pub mod server;
pub mod service;
pub mod store;

pub use in_process::InProcessTransport;
pub use resource::ResourceError;
pub use server::{backend_router, BackendState};
pub use service::ReferenceBackend;
pub use store::{DocumentStore, MemoryDocumentStore, MemoryObjectStore, ObjectStore};
