use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use artifactory_resource_checksum::Checksums;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::build_runs::format_timestamp;
use crate::error::ArtifactoryError;

// ---------------------------------------------------------------------------
// Deployable artifacts
// ---------------------------------------------------------------------------

/// Where the bytes of a [`DeployableArtifact`] come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactContent {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// A single artifact to upload.
#[derive(Debug, Clone)]
pub struct DeployableArtifact {
    path: String,
    content: ArtifactContent,
    size: u64,
    properties: Vec<(String, String)>,
    checksums: OnceLock<Checksums>,
}

impl DeployableArtifact {
    /// Artifact backed by a file on disk. `path` is the repository path.
    pub fn from_file(path: impl Into<String>, file: impl Into<PathBuf>) -> std::io::Result<Self> {
        let file = file.into();
        let size = std::fs::metadata(&file)?.len();
        Ok(Self::new(path.into(), ArtifactContent::File(file), size))
    }

    /// Artifact backed by an in-memory buffer.
    pub fn from_bytes(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self::new(path.into(), ArtifactContent::Bytes(bytes), size)
    }

    fn new(path: String, content: ArtifactContent, size: u64) -> Self {
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            path,
            content,
            size,
            properties: Vec::new(),
            checksums: OnceLock::new(),
        }
    }

    /// Supplies known checksums instead of computing them.
    pub fn with_checksums(self, checksums: Checksums) -> Self {
        let _ = self.checksums.set(checksums);
        self
    }

    /// Sets a property, replacing an existing value in place.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Repository path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn content(&self) -> &ArtifactContent {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Checksums if already known.
    pub fn cached_checksums(&self) -> Option<&Checksums> {
        self.checksums.get()
    }

    /// Returns the checksums, hashing the content on first use.
    ///
    /// File content is hashed on the blocking pool.
    pub async fn checksums(&self) -> Result<Checksums, ArtifactoryError> {
        if let Some(checksums) = self.checksums.get() {
            return Ok(checksums.clone());
        }
        let computed = match &self.content {
            ArtifactContent::Bytes(bytes) => Checksums::from_bytes(bytes),
            ArtifactContent::File(file) => {
                let file = file.clone();
                tokio::task::spawn_blocking(move || Checksums::from_file(&file)).await??
            }
        };
        Ok(self.checksums.get_or_init(|| computed).clone())
    }

    /// Reads the whole content into memory.
    pub async fn read_content(&self) -> Result<Vec<u8>, ArtifactoryError> {
        match &self.content {
            ArtifactContent::Bytes(bytes) => Ok(bytes.clone()),
            ArtifactContent::File(file) => Ok(tokio::fs::read(file).await?),
        }
    }

    /// Local file backing this artifact, if any.
    pub fn file(&self) -> Option<&Path> {
        match &self.content {
            ArtifactContent::File(file) => Some(file),
            ArtifactContent::Bytes(_) => None,
        }
    }
}

/// Per-call deploy options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Always upload content, never attempt a checksum-only deploy.
    pub disable_checksum_uploads: bool,
}

// ---------------------------------------------------------------------------
// Server-side records
// ---------------------------------------------------------------------------

/// An artifact already stored on the server, as returned by AQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedArtifact {
    pub repo: String,
    pub path: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub modified_by: String,
    #[serde(default)]
    pub updated: String,
}

impl DeployedArtifact {
    /// Path of the artifact inside its repository, without a leading `/`.
    pub fn repository_path(&self) -> String {
        match self.path.trim_matches('/') {
            "" | "." => self.name.clone(),
            path => format!("{path}/{}", self.name),
        }
    }
}

/// One recorded build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRun {
    pub build_number: String,
    pub started: DateTime<Utc>,
}

impl BuildRun {
    pub fn new(build_number: impl Into<String>, started: DateTime<Utc>) -> Self {
        Self {
            build_number: build_number.into(),
            started,
        }
    }
}

impl PartialOrd for BuildRun {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by start time only.
impl Ord for BuildRun {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.started.cmp(&other.started)
    }
}

// ---------------------------------------------------------------------------
// Build info
// ---------------------------------------------------------------------------

/// Build-info schema version understood by the server.
const BUILD_INFO_VERSION: &str = "1.0.1";

/// Build-info document published after a deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub name: String,
    pub number: String,
    pub started: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub agent: BuildAgent,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub modules: Vec<BuildModule>,
}

impl BuildInfo {
    pub fn new(
        name: impl Into<String>,
        number: impl Into<String>,
        started: DateTime<Utc>,
        agent: BuildAgent,
    ) -> Self {
        Self {
            version: BUILD_INFO_VERSION.to_string(),
            name: name.into(),
            number: number.into(),
            started: format_timestamp(started),
            url: None,
            agent,
            properties: BTreeMap::new(),
            modules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAgent {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildModule {
    pub id: String,
    #[serde(default)]
    pub artifacts: Vec<BuildArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub sha1: String,
    pub md5: String,
    pub name: String,
}
