use std::time::Duration;

/// Errors reading a command request.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no request received on stdin within {0:?}")]
    InputTimeout(Duration),

    #[error("empty request on stdin")]
    EmptyInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),
}
