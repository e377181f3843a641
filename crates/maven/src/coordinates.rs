use std::fmt;

use crate::CoordinatesError;
use crate::version::{MavenVersionType, SNAPSHOT_SUFFIX, SNAPSHOT_TOKEN, TIMESTAMP_TOKEN};

/// Maven coordinates of a single repository file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinates {
    group_id: String,
    artifact_id: String,
    version: String,
    classifier: String,
    extension: String,
    snapshot_version: String,
}

impl MavenCoordinates {
    /// Parses coordinates from a `group/artifact/version/filename` path.
    ///
    /// The group may span several segments (`com/example/project` becomes
    /// `com.example.project`). A leading `/` is ignored.
    pub fn from_path(path: &str) -> Result<Self, CoordinatesError> {
        let clean = path.strip_prefix('/').unwrap_or(path);
        parse_clean_path(clean).map_err(|reason| CoordinatesError::MalformedPath {
            path: path.to_string(),
            reason,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Declared version, possibly ending in `-SNAPSHOT`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Classifier, empty when the file has none.
    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Version as it appears in the file name (may carry a build timestamp).
    pub fn snapshot_version(&self) -> &str {
        &self.snapshot_version
    }

    /// Version type derived from [`snapshot_version`](Self::snapshot_version).
    pub fn version_type(&self) -> MavenVersionType {
        MavenVersionType::from_version(&self.snapshot_version)
    }

    pub fn is_snapshot_version(&self) -> bool {
        self.version_type().is_snapshot()
    }

    /// Build-info module id: `group:artifact:version`.
    pub fn module_id(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Rebuilds the file name from the parsed parts.
    pub fn file_name(&self) -> String {
        self.file_name_for_version(&self.snapshot_version)
    }

    /// File name with a timestamped snapshot version replaced by the
    /// declared `-SNAPSHOT` version. Other versions are returned unchanged.
    pub fn timestamp_stripped_file_name(&self) -> String {
        if self.version_type() == MavenVersionType::TimestampSnapshot {
            self.file_name_for_version(&self.version)
        } else {
            self.file_name()
        }
    }

    fn file_name_for_version(&self, version: &str) -> String {
        let mut name = format!("{}-{}", self.artifact_id, version);
        if !self.classifier.is_empty() {
            name.push('-');
            name.push_str(&self.classifier);
        }
        name.push('.');
        name.push_str(&self.extension);
        name
    }
}

impl fmt::Display for MavenCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, "@{}", self.extension)
    }
}

fn parse_clean_path(path: &str) -> Result<MavenCoordinates, String> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 4 {
        return Err("path is too short".into());
    }
    let count = parts.len();
    let group_id = parts[..count - 3].join(".");
    let artifact_id = parts[count - 3];
    let version = parts[count - 2];
    let name = parts[count - 1];
    if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
        return Err("path has empty segments".into());
    }

    let remainder = name
        .strip_prefix(artifact_id)
        .and_then(|rest| rest.strip_prefix('-'))
        .ok_or_else(|| format!("name '{name}' does not start with '{artifact_id}-'"))?;
    let (snapshot_version_and_classifier, extension) = remainder
        .rsplit_once('.')
        .ok_or_else(|| format!("name '{name}' has no extension"))?;

    let root_version = version.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(version);

    let mut classifier = snapshot_version_and_classifier;
    classifier = strip_dash(classifier.strip_prefix(root_version).unwrap_or(classifier));
    if let Some(found) = TIMESTAMP_TOKEN.find(classifier) {
        classifier = &classifier[found.end()..];
    }
    classifier = strip_dash(classifier);
    classifier = strip_dash(classifier.strip_prefix(SNAPSHOT_TOKEN).unwrap_or(classifier));

    let snapshot_version = &snapshot_version_and_classifier
        [..snapshot_version_and_classifier.len() - classifier.len()];
    let snapshot_version = snapshot_version.strip_suffix('-').unwrap_or(snapshot_version);

    Ok(MavenCoordinates {
        group_id,
        artifact_id: artifact_id.to_string(),
        version: version.to_string(),
        classifier: classifier.to_string(),
        extension: extension.to_string(),
        snapshot_version: snapshot_version.to_string(),
    })
}

fn strip_dash(value: &str) -> &str {
    value.strip_prefix('-').unwrap_or(value)
}
