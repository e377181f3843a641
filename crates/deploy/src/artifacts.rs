//! Turning scanned files into deployable artifacts.

use std::collections::BTreeMap;
use std::path::Path;

use artifactory_resource_client::DeployableArtifact;
use artifactory_resource_fileset::{Category, FileSet, is_maven_metadata, relative_path};
use artifactory_resource_maven::{MavenCoordinates, MavenVersionType};
use tracing::debug;

use crate::error::DeployError;

const SIGNATURE_SUFFIX: &str = ".asc";

/// Artifacts grouped by category, each group in deploy order.
#[derive(Debug, Clone, Default)]
pub struct DeployableArtifacts {
    batches: BTreeMap<Category, Vec<DeployableArtifact>>,
}

impl DeployableArtifacts {
    /// Builds artifacts for every file of `file_set`.
    ///
    /// Repository paths are relative to `root`. Each artifact gets
    /// `properties` in order. With `strip_timestamps`, timestamped snapshot
    /// file names are rewritten to their `-SNAPSHOT` form.
    pub fn from_file_set(
        root: &Path,
        file_set: &FileSet,
        properties: &[(String, String)],
        strip_timestamps: bool,
    ) -> Result<Self, DeployError> {
        let mut artifacts = Self::default();
        for (file, category) in file_set.iter_categorized() {
            let mut path = relative_path(root, file)?;
            if strip_timestamps {
                path = strip_snapshot_timestamp(&path);
            }
            let mut artifact = DeployableArtifact::from_file(path, file)?;
            for (key, value) in properties {
                artifact.set_property(key, value);
            }
            artifacts.push(category, artifact);
        }
        Ok(artifacts)
    }

    /// Appends an artifact to its category's batch.
    pub fn push(&mut self, category: Category, artifact: DeployableArtifact) {
        self.batches.entry(category).or_default().push(artifact);
    }

    /// Non-empty batches in category priority order.
    pub fn batches(&self) -> impl Iterator<Item = (Category, &[DeployableArtifact])> {
        self.batches
            .iter()
            .filter(|(_, batch)| !batch.is_empty())
            .map(|(category, batch)| (*category, batch.as_slice()))
    }

    pub fn into_batches(self) -> BTreeMap<Category, Vec<DeployableArtifact>> {
        self.batches
            .into_iter()
            .filter(|(_, batch)| !batch.is_empty())
            .collect()
    }

    /// All artifacts in deploy order.
    pub fn iter(&self) -> impl Iterator<Item = &DeployableArtifact> {
        self.batches.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rewrites a timestamped snapshot file name to its `-SNAPSHOT` form.
///
/// Paths that are not Maven paths, and Maven metadata, are returned
/// unchanged. Signatures are rewritten like the file they sign.
pub fn strip_snapshot_timestamp(path: &str) -> String {
    if let Some(signed) = path.strip_suffix(SIGNATURE_SUFFIX) {
        return format!("{}{SIGNATURE_SUFFIX}", strip_snapshot_timestamp(signed));
    }
    let Some((parent, name)) = path.rsplit_once('/') else {
        return path.to_string();
    };
    if is_maven_metadata(name) {
        return path.to_string();
    }
    match MavenCoordinates::from_path(path) {
        Ok(coordinates) if coordinates.version_type() == MavenVersionType::TimestampSnapshot => {
            let stripped = coordinates.timestamp_stripped_file_name();
            debug!(from = name, to = %stripped, "stripped snapshot timestamp");
            format!("{parent}/{stripped}")
        }
        _ => path.to_string(),
    }
}

/// Produces detached signatures.
///
/// No signer ships with the resource; programs embedding this crate supply
/// one and call [`sign_artifacts`] before deploying.
pub trait ArtifactSigner: Send + Sync {
    /// Signs `content`, returning the ASCII-armored signature.
    fn sign(&self, content: &[u8]) -> Result<Vec<u8>, String>;
}

/// Adds a `.asc` signature for every artifact that is neither a signature
/// nor Maven metadata and is not already signed. Returns the number added.
pub async fn sign_artifacts(
    artifacts: &mut DeployableArtifacts,
    signer: &dyn ArtifactSigner,
) -> Result<usize, DeployError> {
    let existing: Vec<String> = artifacts
        .batches
        .get(&Category::Signature)
        .map(|batch| batch.iter().map(|a| a.path().to_string()).collect())
        .unwrap_or_default();

    let mut signatures = Vec::new();
    for (category, batch) in &artifacts.batches {
        if matches!(category, Category::Signature | Category::MavenMetadata) {
            continue;
        }
        for artifact in batch {
            let path = format!("{}{SIGNATURE_SUFFIX}", artifact.path());
            if existing.contains(&path) {
                continue;
            }
            let content = artifact.read_content().await?;
            let signature = signer.sign(&content).map_err(|reason| DeployError::Signing {
                path: artifact.path().to_string(),
                reason,
            })?;
            let mut signed = DeployableArtifact::from_bytes(path, signature);
            for (key, value) in artifact.properties() {
                signed.set_property(key, value);
            }
            signatures.push(signed);
        }
    }

    let added = signatures.len();
    for signature in signatures {
        artifacts.push(Category::Signature, signature);
    }
    debug!(added, "signatures added");
    Ok(added)
}
