//! Category-ordered concurrent deploy.
//!
//! Categories go out strictly one after another. Inside a category, up to
//! `threads` artifacts are uploaded at once. A category is always drained
//! completely before its first failure is reported, and no later category
//! is started after a failure.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use artifactory_resource_client::{ArtifactoryRepository, DeployOptions, DeployableArtifact};
use artifactory_resource_fileset::Category;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::DeployError;

/// Uploads one artifact.
///
/// Implemented on top of [`ArtifactoryRepository`] by [`RepositoryDeployer`];
/// tests provide fakes.
pub trait ArtifactDeployer: Send + Sync {
    fn deploy(
        &self,
        artifact: DeployableArtifact,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeployError>> + Send + '_>>;
}

/// Deploys to a repository with fixed options.
#[derive(Debug, Clone)]
pub struct RepositoryDeployer {
    repository: ArtifactoryRepository,
    options: DeployOptions,
}

impl RepositoryDeployer {
    pub fn new(repository: ArtifactoryRepository, options: DeployOptions) -> Self {
        Self {
            repository,
            options,
        }
    }
}

impl ArtifactDeployer for RepositoryDeployer {
    fn deploy(
        &self,
        artifact: DeployableArtifact,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeployError>> + Send + '_>> {
        Box::pin(async move {
            self.repository.deploy(&artifact, &self.options).await?;
            Ok(())
        })
    }
}

/// Runs category batches with at most `threads` uploads in flight.
#[derive(Debug, Clone, Copy)]
pub struct DeployCoordinator {
    threads: usize,
}

impl DeployCoordinator {
    /// `threads` below 1 is treated as 1.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Deploys every batch in category order. Returns the number of
    /// artifacts deployed.
    pub async fn deploy_all(
        &self,
        batches: BTreeMap<Category, Vec<DeployableArtifact>>,
        deployer: Arc<dyn ArtifactDeployer>,
    ) -> Result<usize, DeployError> {
        let mut deployed = 0;

        for (category, batch) in batches {
            if batch.is_empty() {
                continue;
            }
            info!(%category, artifacts = batch.len(), threads = self.threads, "deploying category");

            let mut join_set: JoinSet<Result<(), DeployError>> = JoinSet::new();
            let mut first_error = None;
            for artifact in batch {
                while join_set.len() >= self.threads {
                    if let Some(joined) = join_set.join_next().await {
                        settle(category, joined, &mut deployed, &mut first_error);
                    }
                }
                let deployer = Arc::clone(&deployer);
                join_set.spawn(async move {
                    debug!(path = artifact.path(), "deploy started");
                    deployer.deploy(artifact).await
                });
            }
            while let Some(joined) = join_set.join_next().await {
                settle(category, joined, &mut deployed, &mut first_error);
            }
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        info!(deployed, "deploy complete");
        Ok(deployed)
    }
}

fn settle(
    category: Category,
    joined: Result<Result<(), DeployError>, tokio::task::JoinError>,
    deployed: &mut usize,
    first_error: &mut Option<DeployError>,
) {
    match joined.map_err(DeployError::from).and_then(|r| r) {
        Ok(()) => *deployed += 1,
        Err(err) => {
            error!(%category, error = %err, "artifact deploy failed");
            first_error.get_or_insert(err);
        }
    }
}
