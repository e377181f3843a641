//! The three resource commands.

pub mod check;
pub mod get;
pub mod put;

use anyhow::{Context, Result};
use artifactory_resource_client::{ArtifactoryClient, BuildRuns, BuildRunsConfig};
use artifactory_resource_protocol::Source;
use tokio_util::sync::CancellationToken;

/// Connects to the server described by `source`. Cancelling `cancel` stops
/// pending retries.
pub(crate) fn connect(source: &Source, cancel: &CancellationToken) -> Result<ArtifactoryClient> {
    source.validate()?;
    let client = ArtifactoryClient::new(source.base_uri(), &source.username, &source.password)
        .with_context(|| format!("cannot create client for {}", source.base_uri()))?;
    Ok(client.with_cancellation_token(cancel.clone()))
}

/// Build-run queries for the source's build.
pub(crate) fn build_runs(client: &ArtifactoryClient, source: &Source) -> BuildRuns {
    client.build_runs(BuildRunsConfig {
        build_name: source.build_name.clone(),
        project: source.project.clone(),
        admin: source.admin,
        limit: source.check_limit,
    })
}
