//! Build-info document for a deployed set of artifacts.

use std::collections::BTreeMap;

use artifactory_resource_client::{BuildAgent, BuildArtifact, BuildInfo, BuildModule};
use artifactory_resource_maven::MavenCoordinates;
use chrono::{DateTime, Utc};

use crate::artifacts::DeployableArtifacts;
use crate::error::DeployError;

/// Describes `artifacts` as one build run.
///
/// Maven artifacts are grouped into modules by `group:artifact:version`.
/// Everything else goes into a module named after the build.
pub async fn build_info(
    name: &str,
    number: &str,
    started: DateTime<Utc>,
    agent: BuildAgent,
    artifacts: &DeployableArtifacts,
) -> Result<BuildInfo, DeployError> {
    let mut modules: BTreeMap<String, Vec<BuildArtifact>> = BTreeMap::new();
    for artifact in artifacts.iter() {
        let module_id = MavenCoordinates::from_path(artifact.path())
            .map(|coordinates| coordinates.module_id())
            .unwrap_or_else(|_| name.to_string());
        let checksums = artifact.checksums().await?;
        let file_name = artifact.name();
        let kind = file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_string())
            .unwrap_or_default();
        modules.entry(module_id).or_default().push(BuildArtifact {
            kind,
            sha1: checksums.sha1().to_string(),
            md5: checksums.md5().to_string(),
            name: file_name.to_string(),
        });
    }

    let mut info = BuildInfo::new(name, number, started, agent);
    info.modules = modules
        .into_iter()
        .map(|(id, artifacts)| BuildModule { id, artifacts })
        .collect();
    Ok(info)
}
