use std::error::Error as StdError;

use artifactory_resource_checksum::ChecksumError;

/// Errors from the repository client.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactoryError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A status the server is known to return transiently (400, 404).
    #[error("server returned {status} for {url}: {body}")]
    FlakyResponse {
        status: u16,
        url: String,
        body: String,
    },

    #[error("server returned {status} for {url}: {body}")]
    ServerResponse {
        status: u16,
        url: String,
        body: String,
    },

    #[error("failed to deploy {path} (sha1 {sha1}, md5 {md5}) after {attempts} attempt(s)")]
    Deploy {
        path: String,
        sha1: String,
        md5: String,
        attempts: u32,
        #[source]
        source: Box<ArtifactoryError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("refusing unsafe artifact path '{0}'")]
    UnsafePath(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ArtifactoryError {
    /// Classifies a non-success HTTP status.
    pub(crate) fn from_status(status: u16, url: impl Into<String>, body: String) -> Self {
        let url = url.into();
        if matches!(status, 400 | 404) {
            Self::FlakyResponse { status, url, body }
        } else {
            Self::ServerResponse { status, url, body }
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::FlakyResponse { status, .. } | Self::ServerResponse { status, .. } => {
                Some(*status)
            }
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Deploy { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether the failure happened on the wire rather than at the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_)) && is_transport_failure(self)
    }

    /// Retry classification for content uploads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FlakyResponse { .. }) || self.is_transport()
    }
}

/// Walks the source chain of `err` looking for a connection-level failure.
///
/// Connect, timeout, request and body errors from `reqwest` count, as does
/// any `std::io::Error` found below them.
pub fn is_transport_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(err) = current {
        if let Some(err) = err.downcast_ref::<reqwest::Error>()
            && (err.is_connect() || err.is_timeout() || err.is_request() || err.is_body())
        {
            return true;
        }
        if err.is::<std::io::Error>() {
            return true;
        }
        current = err.source();
    }
    false
}
