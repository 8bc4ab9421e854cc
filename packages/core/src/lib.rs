//! MCP Core: message envelope, response builder, and workflow payload schemas.

pub mod envelope;
pub mod error;
pub mod operations;
pub mod response;
pub mod workflow;

pub use envelope::{
    validate, Correlation, Envelope, EnvelopeError, MessageKind, Metadata, Party, Payload,
    ResponseStatus, HUB_ID, MCP_VERSION,
};
pub use error::ErrorKind;
pub use response::ResponseBuilder;
