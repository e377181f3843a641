//! Deploy error types.

/// Errors produced while preparing or deploying artifacts.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Artifactory(#[from] artifactory_resource_client::ArtifactoryError),

    #[error(transparent)]
    FileSet(#[from] artifactory_resource_fileset::FileSetError),

    #[error("signing failed for {path}: {reason}")]
    Signing { path: String, reason: String },

    #[error("deploy task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
