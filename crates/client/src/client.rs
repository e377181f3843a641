//! Shared HTTP connection to the repository server.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::build_runs::{BuildRuns, BuildRunsConfig};
use crate::error::ArtifactoryError;
use crate::repository::ArtifactoryRepository;

/// Authenticated client for one server.
///
/// Cheap to clone; clones share the connection pool and the cancellation
/// token.
#[derive(Debug, Clone)]
pub struct ArtifactoryClient {
    http: reqwest::Client,
    base_url: String,
    cancel: CancellationToken,
}

impl ArtifactoryClient {
    /// Creates a client using HTTP Basic authentication. An empty username
    /// sends anonymous requests.
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, ArtifactoryError> {
        let mut headers = HeaderMap::new();
        if !username.is_empty() {
            let token = STANDARD.encode(format!("{username}:{password}"));
            let mut value = HeaderValue::from_str(&format!("Basic {token}"))
                .map_err(|_| ArtifactoryError::InvalidCredentials)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("artifactory-resource/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cancel: CancellationToken::new(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token that interrupts pending retry delays when cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Replaces the cancellation token, typically with one owned by the
    /// caller's shutdown handling.
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Operations on one repository.
    pub fn repository(&self, key: impl Into<String>) -> ArtifactoryRepository {
        ArtifactoryRepository::new(self.clone(), key.into())
    }

    /// Build-run queries for one build name.
    pub fn build_runs(&self, config: BuildRunsConfig) -> BuildRuns {
        BuildRuns::new(self.clone(), config)
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends `request` and maps non-success statuses to errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ArtifactoryError> {
        let resp = request.send().await?;
        let status = resp.status();
        debug!(url = %resp.url(), status = status.as_u16(), "response");
        if !status.is_success() {
            let url = resp.url().to_string();
            let body = resp.text().await.unwrap_or_default();
            return Err(ArtifactoryError::from_status(status.as_u16(), url, body));
        }
        Ok(resp)
    }
}

/// Characters left unescaped in path segments and matrix parameters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes one URL path segment or matrix parameter part.
pub(crate) fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
