//! Per-command request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::types::{MetadataEntry, Source, Version};

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    1
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Versions newer than or equal to the requested one, oldest first.
pub type CheckResponse = Vec<Version>;

// ---------------------------------------------------------------------------
// in
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
    #[serde(default)]
    pub params: InParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InParams {
    #[serde(default = "default_true")]
    pub download_artifacts: bool,
    #[serde(default = "default_true")]
    pub download_checksums: bool,
    #[serde(default)]
    pub save_build_info: bool,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for InParams {
    fn default() -> Self {
        Self {
            download_artifacts: true,
            download_checksums: true,
            save_build_info: false,
            threads: default_threads(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InResponse {
    pub version: Version,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

// ---------------------------------------------------------------------------
// out
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutRequest {
    pub source: Source,
    pub params: OutParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutParams {
    /// Directory, relative to the command's working directory, to deploy.
    #[serde(default)]
    pub folder: String,
    /// Target repository key.
    #[serde(default)]
    pub repo: String,
    /// Build number to publish under. Generated from the current time when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Link back to the CI build, recorded in the build info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_uri: Option<String>,
    #[serde(default = "default_true")]
    pub strip_snapshot_timestamps: bool,
    #[serde(default)]
    pub disable_checksum_uploads: bool,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifact_properties: BTreeMap<String, String>,
}

impl OutParams {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.folder.trim().is_empty() {
            return Err(ProtocolError::Missing("folder"));
        }
        if self.repo.trim().is_empty() {
            return Err(ProtocolError::Missing("repo"));
        }
        if self.repo.contains('/') {
            return Err(ProtocolError::Invalid {
                field: "repo",
                reason: format!("'{}' must be a repository key, not a path", self.repo),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutResponse {
    pub version: Version,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}
