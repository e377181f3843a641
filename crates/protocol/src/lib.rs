//! Request and response types for the `check`, `in` and `out` commands.
//!
//! Each command reads one JSON request from standard input and writes one
//! JSON response to standard output. Field names are `snake_case`.

pub mod messages;
pub mod types;

pub use messages::{
    CheckRequest, CheckResponse, InParams, InRequest, InResponse, OutParams, OutRequest,
    OutResponse,
};
pub use types::{MetadataEntry, Source, Version};

/// Errors produced while reading or validating requests.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),

    #[error("invalid field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
