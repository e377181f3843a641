//! `in`: fetch a build run's artifacts and optionally its build info.

use std::path::Path;

use anyhow::{Context, Result};
use artifactory_resource_protocol::{InRequest, InResponse, MetadataEntry};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{build_runs, connect};

/// File the raw build info is saved to.
pub const BUILD_INFO_FILE: &str = "build-info.json";

pub async fn run(
    dir: &Path,
    request: InRequest,
    cancel: &CancellationToken,
) -> Result<InResponse> {
    let client = connect(&request.source, cancel)?;
    let runs_api = build_runs(&client, &request.source);
    let build_number = request.version.build_number.as_str();
    let params = &request.params;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create {}", dir.display()))?;

    let mut downloaded = 0;
    if params.download_artifacts {
        let artifacts = runs_api.get_deployed_artifacts(build_number).await?;
        info!(build_number, artifacts = artifacts.len(), "downloading artifacts");
        let client = &client;
        let results: Vec<_> = stream::iter(artifacts.iter())
            .map(|artifact| async move {
                client
                    .repository(&artifact.repo)
                    .download(artifact, dir, params.download_checksums)
                    .await
                    .with_context(|| format!("cannot download {}", artifact.repository_path()))
            })
            .buffer_unordered(params.threads.max(1))
            .try_collect()
            .await?;
        downloaded = results.len();
    }

    if params.save_build_info {
        let raw = runs_api.get_raw_build_info(build_number).await?;
        let target = dir.join(BUILD_INFO_FILE);
        tokio::fs::write(&target, raw)
            .await
            .with_context(|| format!("cannot write {}", target.display()))?;
        info!(target = %target.display(), "build info saved");
    }

    Ok(InResponse {
        version: request.version.clone(),
        metadata: vec![
            MetadataEntry::new("build_name", &request.source.build_name),
            MetadataEntry::new("artifacts", downloaded.to_string()),
        ],
    })
}
