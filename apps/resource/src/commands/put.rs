//! `out`: deploy a directory as a new build run and publish its build info.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use artifactory_resource_checksum::is_checksum_file;
use artifactory_resource_client::{BuildAgent, DeployOptions};
use artifactory_resource_deploy::{
    DeployCoordinator, DeployableArtifacts, RepositoryDeployer, build_info,
};
use artifactory_resource_fileset::{FileSet, PathFilter, relative_path, scan_directory};
use artifactory_resource_protocol::{MetadataEntry, OutParams, OutRequest, OutResponse, Version};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{build_runs, connect};

/// Format of generated build numbers.
const BUILD_NUMBER_FORMAT: &str = "%Y%m%d%H%M%S";

pub async fn run(
    dir: &Path,
    request: OutRequest,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<OutResponse> {
    let client = connect(&request.source, cancel)?;
    let params = &request.params;
    params.validate()?;

    let build_name = request.source.build_name.as_str();
    let build_number = params
        .build_number
        .clone()
        .unwrap_or_else(|| now.format(BUILD_NUMBER_FORMAT).to_string());
    let root = dir.join(&params.folder);
    info!(build_name, build_number = %build_number, root = %root.display(), "deploying build");

    let files = collect_files(&root, params)?;
    if files.is_empty() {
        bail!("no files to deploy in {}", root.display());
    }
    let file_set = FileSet::of(files);

    let properties = artifact_properties(build_name, &build_number, now, params);
    let artifacts = DeployableArtifacts::from_file_set(
        &root,
        &file_set,
        &properties,
        params.strip_snapshot_timestamps,
    )?;

    // Hashes every artifact once; the deploy below reuses the cached values.
    let agent = BuildAgent {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mut info = build_info(build_name, &build_number, now, agent, &artifacts).await?;
    info.url = params.build_uri.clone();
    info.properties = params.build_properties.clone();

    let deployer = RepositoryDeployer::new(
        client.repository(&params.repo),
        DeployOptions {
            disable_checksum_uploads: params.disable_checksum_uploads,
        },
    );
    let deployed = DeployCoordinator::new(params.threads)
        .deploy_all(artifacts.clone().into_batches(), Arc::new(deployer))
        .await
        .context("artifact deploy failed")?;

    build_runs(&client, &request.source)
        .add(&info)
        .await
        .context("cannot publish build info")?;

    let mut metadata = vec![
        MetadataEntry::new("build_name", build_name),
        MetadataEntry::new("artifacts", deployed.to_string()),
    ];
    if let Some(uri) = &params.build_uri {
        metadata.push(MetadataEntry::new("build_uri", uri));
    }
    Ok(OutResponse {
        version: Version::new(build_number, now),
        metadata,
    })
}

/// Scans `root` and keeps included, non-excluded, non-checksum files.
fn collect_files(root: &Path, params: &OutParams) -> Result<Vec<PathBuf>> {
    let filter = PathFilter::new(&params.include, &params.exclude)?;
    let mut files = Vec::new();
    for file in scan_directory(root).with_context(|| format!("cannot scan {}", root.display()))? {
        let relative = relative_path(root, &file)?;
        if filter.matches(&relative) && !is_checksum_file(&relative) {
            files.push(file);
        }
    }
    Ok(files)
}

/// Matrix properties attached to every artifact, in deploy order.
fn artifact_properties(
    build_name: &str,
    build_number: &str,
    started: DateTime<Utc>,
    params: &OutParams,
) -> Vec<(String, String)> {
    let mut properties = vec![
        ("build.name".to_string(), build_name.to_string()),
        ("build.number".to_string(), build_number.to_string()),
        (
            "build.timestamp".to_string(),
            started.timestamp_millis().to_string(),
        ),
    ];
    properties.extend(
        params
            .artifact_properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    properties
}
