//! HTTP client for an Artifactory-style repository server.
//!
//! [`ArtifactoryClient`] owns the shared connection pool and credentials.
//! Repository operations (deploy, download) live on
//! [`ArtifactoryRepository`]; build-run queries and build-info publication
//! live on [`BuildRuns`].

pub mod build_runs;
pub mod client;
pub mod error;
pub mod repository;
pub mod retry;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock_server;

pub use build_runs::{
    AqlSearch, BuildRunQuery, BuildRuns, BuildRunsConfig, BuildRunsStrategy, Listing,
    format_timestamp, parse_timestamp,
};
pub use client::ArtifactoryClient;
pub use error::{ArtifactoryError, is_transport_failure};
pub use repository::{ArtifactoryRepository, CHECKSUM_THRESHOLD};
pub use retry::{Exhausted, RetryPolicy};
pub use types::{
    ArtifactContent, BuildAgent, BuildArtifact, BuildInfo, BuildModule, BuildRun,
    DeployOptions, DeployableArtifact, DeployedArtifact,
};
