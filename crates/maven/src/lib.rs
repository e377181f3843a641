//! Maven coordinates derived from repository-relative paths.
//!
//! A path such as
//! `/com/example/my-project/1.0.0-SNAPSHOT/my-project-1.0.0-20171005.194031-1-sources.jar`
//! carries the full `group:artifact:version:classifier@extension` tuple.
//! The publishing side uses it for snapshot-timestamp normalization and to
//! group artifacts into build modules.

mod coordinates;
mod version;

pub use coordinates::MavenCoordinates;
pub use version::MavenVersionType;

/// Errors produced while deriving Maven coordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatesError {
    #[error("unable to parse maven coordinates from path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },
}
