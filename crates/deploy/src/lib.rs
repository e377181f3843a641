//! Deploys a prepared set of artifacts in category order.
//!
//! # Pipeline
//!
//! 1. **Prepare**: turn a [`FileSet`](artifactory_resource_fileset::FileSet)
//!    into per-category [`DeployableArtifacts`], attaching properties and
//!    normalizing snapshot file names
//! 2. **Sign** (optional): add `.asc` signatures through an [`ArtifactSigner`]
//! 3. **Deploy**: [`DeployCoordinator`] uploads one category at a time with
//!    bounded concurrency inside each category
//! 4. **Record**: [`build_info`] describes what was deployed

pub mod artifacts;
pub mod build_info;
pub mod coordinator;
pub mod error;

pub use artifacts::{
    ArtifactSigner, DeployableArtifacts, sign_artifacts, strip_snapshot_timestamp,
};
pub use build_info::build_info;
pub use coordinator::{ArtifactDeployer, DeployCoordinator, RepositoryDeployer};
pub use error::DeployError;
