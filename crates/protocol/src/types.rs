use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Resource configuration shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Server base URI, e.g. `https://repo.example.com/artifactory`.
    pub uri: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub build_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_limit: Option<usize>,
    /// Whether the credentials may run build AQL queries.
    #[serde(default)]
    pub admin: bool,
}

impl Source {
    /// Checks the fields every command depends on.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.uri.trim().is_empty() {
            return Err(ProtocolError::Missing("uri"));
        }
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(ProtocolError::Invalid {
                field: "uri",
                reason: format!("'{}' is not an http(s) URI", self.uri),
            });
        }
        if self.build_name.trim().is_empty() {
            return Err(ProtocolError::Missing("build_name"));
        }
        if self.check_limit == Some(0) {
            return Err(ProtocolError::Invalid {
                field: "check_limit",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// URI without trailing slashes.
    pub fn base_uri(&self) -> &str {
        self.uri.trim_end_matches('/')
    }
}

/// A build run as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub build_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(build_number: impl Into<String>, started: DateTime<Utc>) -> Self {
        Self {
            build_number: build_number.into(),
            started: Some(started),
        }
    }
}

/// One `name`/`value` pair of response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
