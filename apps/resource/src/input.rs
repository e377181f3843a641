//! Request input.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::CommandError;

/// How long to wait for the request before giving up.
pub const INPUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Reads `reader` to the end and parses it as a JSON request.
pub async fn read_request<T, R>(mut reader: R, timeout: Duration) -> Result<T, CommandError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    tokio::time::timeout(timeout, reader.read_to_end(&mut buf))
        .await
        .map_err(|_| CommandError::InputTimeout(timeout))??;
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(CommandError::EmptyInput);
    }
    Ok(serde_json::from_slice(&buf)?)
}
