//! Artifact deploy and download against one repository.
//!
//! Deploys larger than [`CHECKSUM_THRESHOLD`] first try a checksum-only PUT
//! so the server can reuse content it already stores. If the server does not
//! know the checksum (or the request never made it), the content itself is
//! uploaded under a [`RetryPolicy`].

use std::path::{Component, Path, PathBuf};

use artifactory_resource_checksum::{ChecksumAlgorithm, Checksums};
use futures_util::StreamExt;
use reqwest::Body;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::client::{ArtifactoryClient, encode_segment as encode};
use crate::error::ArtifactoryError;
use crate::retry::{Exhausted, RetryPolicy};
use crate::types::{ArtifactContent, DeployOptions, DeployableArtifact, DeployedArtifact};

/// Artifacts at or below this size are always uploaded with content.
pub const CHECKSUM_THRESHOLD: u64 = 10 * 1024;

const CHECKSUM_DEPLOY_HEADER: &str = "X-Checksum-Deploy";

/// One repository on the server.
#[derive(Debug, Clone)]
pub struct ArtifactoryRepository {
    client: ArtifactoryClient,
    key: String,
    retry: RetryPolicy,
}

impl ArtifactoryRepository {
    pub(crate) fn new(client: ArtifactoryClient, key: String) -> Self {
        Self {
            client,
            key,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used for content uploads.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // -----------------------------------------------------------------------
    // Deploy
    // -----------------------------------------------------------------------

    /// Deploys one artifact.
    ///
    /// Terminal failures are reported as [`ArtifactoryError::Deploy`]
    /// carrying the path, checksums and attempt count.
    pub async fn deploy(
        &self,
        artifact: &DeployableArtifact,
        options: &DeployOptions,
    ) -> Result<(), ArtifactoryError> {
        let checksums = artifact.checksums().await?;
        let url = self.deploy_url(artifact);

        if artifact.size() > CHECKSUM_THRESHOLD && !options.disable_checksum_uploads {
            match self.checksum_deploy(&url, &checksums).await {
                Ok(()) => {
                    info!(path = artifact.path(), "deployed by checksum");
                    return Ok(());
                }
                Err(err) if allows_content_fallback(&err) => {
                    debug!(
                        path = artifact.path(),
                        error = %err,
                        "checksum deploy refused, uploading content"
                    );
                }
                Err(err) => return Err(deploy_error(artifact, &checksums, err, 1)),
            }
        }

        let result = self
            .retry
            .run(self.client.cancellation_token(), |attempt| {
                debug!(path = artifact.path(), attempt, "uploading content");
                self.content_deploy(&url, artifact, &checksums)
            })
            .await;
        match result {
            Ok(()) => {
                info!(path = artifact.path(), size = artifact.size(), "deployed");
                Ok(())
            }
            Err(Exhausted { error, attempts }) => {
                Err(deploy_error(artifact, &checksums, error, attempts))
            }
        }
    }

    async fn checksum_deploy(
        &self,
        url: &str,
        checksums: &Checksums,
    ) -> Result<(), ArtifactoryError> {
        let request = self
            .client
            .http()
            .put(url)
            .header(CHECKSUM_DEPLOY_HEADER, "true")
            .header(ChecksumAlgorithm::Sha1.header_name(), checksums.sha1())
            .header(ChecksumAlgorithm::Md5.header_name(), checksums.md5())
            .header(CONTENT_LENGTH, 0);
        self.client.send(request).await?;
        Ok(())
    }

    async fn content_deploy(
        &self,
        url: &str,
        artifact: &DeployableArtifact,
        checksums: &Checksums,
    ) -> Result<(), ArtifactoryError> {
        let body = match artifact.content() {
            ArtifactContent::Bytes(bytes) => Body::from(bytes.clone()),
            ArtifactContent::File(file) => {
                let file = tokio::fs::File::open(file).await?;
                Body::wrap_stream(ReaderStream::new(file))
            }
        };
        let request = self
            .client
            .http()
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, artifact.size())
            .header(ChecksumAlgorithm::Sha1.header_name(), checksums.sha1())
            .header(ChecksumAlgorithm::Md5.header_name(), checksums.md5())
            .body(body);
        self.client.send(request).await?;
        Ok(())
    }

    /// `{base}/{repo}{path};key=value;...` with every part percent-encoded.
    pub fn deploy_url(&self, artifact: &DeployableArtifact) -> String {
        let mut url = self
            .client
            .url(&format!("/{}{}", encode(&self.key), encode_path(artifact.path())));
        for (key, value) in artifact.properties() {
            url.push(';');
            url.push_str(&encode(key));
            url.push('=');
            url.push_str(&encode(value));
        }
        url
    }

    // -----------------------------------------------------------------------
    // Download
    // -----------------------------------------------------------------------

    /// Downloads `artifact` to `destination/{path}/{name}`.
    ///
    /// With `download_checksums`, the `.md5` and `.sha1` companions are
    /// fetched too; failures to fetch them are logged and ignored.
    pub async fn download(
        &self,
        artifact: &DeployedArtifact,
        destination: &Path,
        download_checksums: bool,
    ) -> Result<PathBuf, ArtifactoryError> {
        let relative = artifact.repository_path();
        let target = safe_join(destination, &relative)?;
        let url = self.download_url(&artifact.repo, &relative);

        self.fetch_to_file(&url, &target).await?;
        info!(path = %relative, target = %target.display(), "downloaded");

        if download_checksums {
            for algorithm in ChecksumAlgorithm::ALL {
                let extension = algorithm.extension();
                let companion_url = format!("{url}.{extension}");
                let mut companion = target.clone().into_os_string();
                companion.push(format!(".{extension}"));
                if let Err(err) = self.fetch_to_file(&companion_url, Path::new(&companion)).await {
                    warn!(
                        path = %relative,
                        algorithm = %algorithm,
                        error = %err,
                        "checksum companion unavailable"
                    );
                }
            }
        }
        Ok(target)
    }

    fn download_url(&self, repo: &str, relative: &str) -> String {
        self.client
            .url(&format!("/{}/{}", encode(repo), encode_path(relative).trim_start_matches('/')))
    }

    async fn fetch_to_file(&self, url: &str, target: &Path) -> Result<(), ArtifactoryError> {
        let resp = self.client.send(self.client.http().get(url)).await?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn allows_content_fallback(err: &ArtifactoryError) -> bool {
    err.is_transport() || err.status().is_some_and(|s| (400..500).contains(&s))
}

fn deploy_error(
    artifact: &DeployableArtifact,
    checksums: &Checksums,
    error: ArtifactoryError,
    attempts: u32,
) -> ArtifactoryError {
    ArtifactoryError::Deploy {
        path: artifact.path().to_string(),
        sha1: checksums.sha1().to_string(),
        md5: checksums.md5().to_string(),
        attempts,
        source: Box::new(error),
    }
}

/// Encodes each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/').map(encode).collect::<Vec<_>>().join("/")
}

/// Joins a server-supplied relative path onto `root`, rejecting anything
/// that would escape it.
fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, ArtifactoryError> {
    let relative_path = Path::new(relative);
    let escapes = relative_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || escapes {
        return Err(ArtifactoryError::UnsafePath(relative.to_string()));
    }
    Ok(root.join(relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::{MockServer, Reply, refused_url};
    use std::time::Duration;

    fn repository(url: &str) -> ArtifactoryRepository {
        ArtifactoryClient::new(url, "admin", "password")
            .unwrap()
            .repository("libs-release")
            .with_retry_policy(RetryPolicy::default().with_delay(Duration::ZERO))
    }

    fn large_artifact() -> DeployableArtifact {
        DeployableArtifact::from_bytes("/com/example/foo.jar", vec![7u8; 20 * 1024])
    }

    fn small_artifact() -> DeployableArtifact {
        DeployableArtifact::from_bytes("/com/example/foo.pom", b"<project/>".to_vec())
    }

    #[test]
    fn deploy_url_encodes_path_and_matrix_params() {
        let repo = repository("http://localhost");
        let artifact = DeployableArtifact::from_bytes("/com/ex ample/foo+1.jar", Vec::new())
            .with_property("build.name", "my build")
            .with_property("build.number", "1;2=3");
        assert_eq!(
            repo.deploy_url(&artifact),
            "http://localhost/libs-release/com/ex%20ample/foo%2B1.jar;build.name=my%20build;build.number=1%3B2%3D3"
        );
    }

    #[tokio::test]
    async fn small_artifact_uploads_content_directly() {
        let server = MockServer::start(vec![Reply::status(201, "")]).await;
        let artifact = small_artifact();
        repository(&server.url)
            .deploy(&artifact, &DeployOptions::default())
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].target, "/libs-release/com/example/foo.pom");
        assert_eq!(requests[0].header("x-checksum-deploy"), None);
        assert_eq!(requests[0].body, b"<project/>");
        let checksums = Checksums::from_bytes(b"<project/>");
        assert_eq!(requests[0].header("x-checksum-sha1"), Some(checksums.sha1()));
        assert_eq!(requests[0].header("x-checksum-md5"), Some(checksums.md5()));
    }

    #[tokio::test]
    async fn large_artifact_deploys_by_checksum() {
        let server = MockServer::start(vec![Reply::status(201, "")]).await;
        let artifact = large_artifact();
        repository(&server.url)
            .deploy(&artifact, &DeployOptions::default())
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("x-checksum-deploy"), Some("true"));
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn checksum_deploy_404_falls_back_to_content() {
        let server =
            MockServer::start(vec![Reply::status(404, "not found"), Reply::status(201, "")]).await;
        let artifact = large_artifact();
        repository(&server.url)
            .deploy(&artifact, &DeployOptions::default())
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("x-checksum-deploy"), Some("true"));
        assert_eq!(requests[1].header("x-checksum-deploy"), None);
        assert_eq!(requests[1].body.len(), 20 * 1024);
    }

    #[tokio::test]
    async fn checksum_deploy_transport_failure_falls_back_to_content() {
        let server = MockServer::start(vec![Reply::Hangup, Reply::status(201, "")]).await;
        repository(&server.url)
            .deploy(&large_artifact(), &DeployOptions::default())
            .await
            .unwrap();
        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].body.len(), 20 * 1024);
    }

    #[tokio::test]
    async fn checksum_deploy_server_error_is_fatal() {
        let server = MockServer::start(vec![Reply::status(500, "boom")]).await;
        let err = repository(&server.url)
            .deploy(&large_artifact(), &DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactoryError::Deploy { attempts: 1, .. }));
        assert_eq!(err.status(), Some(500));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn disabled_checksum_uploads_send_content() {
        let server = MockServer::start(vec![Reply::status(201, "")]).await;
        let options = DeployOptions {
            disable_checksum_uploads: true,
        };
        repository(&server.url)
            .deploy(&large_artifact(), &options)
            .await
            .unwrap();
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("x-checksum-deploy"), None);
        assert_eq!(requests[0].body.len(), 20 * 1024);
    }

    #[tokio::test]
    async fn flaky_content_upload_is_retried() {
        let server = MockServer::start(vec![
            Reply::status(400, "flaky"),
            Reply::status(404, "flaky"),
            Reply::status(201, ""),
        ])
        .await;
        repository(&server.url)
            .deploy(&small_artifact(), &DeployOptions::default())
            .await
            .unwrap();
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn retries_stop_after_three_attempts() {
        let server = MockServer::start(vec![
            Reply::status(404, "a"),
            Reply::status(404, "b"),
            Reply::status(404, "c"),
            Reply::status(201, ""),
        ])
        .await;
        let artifact = small_artifact();
        let err = repository(&server.url)
            .deploy(&artifact, &DeployOptions::default())
            .await
            .unwrap_err();
        assert_eq!(server.requests().len(), 3);
        match err {
            ArtifactoryError::Deploy {
                path,
                sha1,
                attempts,
                source,
                ..
            } => {
                assert_eq!(path, "/com/example/foo.pom");
                assert_eq!(sha1, Checksums::from_bytes(b"<project/>").sha1());
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ArtifactoryError::FlakyResponse { status: 404, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_content_status_is_not_retried() {
        let server = MockServer::start(vec![Reply::status(403, "forbidden")]).await;
        let err = repository(&server.url)
            .deploy(&small_artifact(), &DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactoryError::Deploy { attempts: 1, .. }));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn connection_refused_is_retried_as_transport_failure() {
        let url = refused_url().await;
        let err = repository(&url)
            .deploy(&small_artifact(), &DeployOptions::default())
            .await
            .unwrap_err();
        match err {
            ArtifactoryError::Deploy { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert!(source.is_transport());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_content_is_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("foo.jar");
        std::fs::write(&file, b"jar bytes").unwrap();
        let artifact = DeployableArtifact::from_file("/foo.jar", &file).unwrap();
        let server = MockServer::start(vec![Reply::status(201, "")]).await;
        repository(&server.url)
            .deploy(&artifact, &DeployOptions::default())
            .await
            .unwrap();
        assert_eq!(server.requests()[0].body, b"jar bytes");
    }

    fn deployed(path: &str, name: &str) -> DeployedArtifact {
        DeployedArtifact {
            repo: "libs-release".into(),
            path: path.into(),
            name: name.into(),
            kind: "file".into(),
            size: 3,
            created: String::new(),
            created_by: String::new(),
            modified: String::new(),
            modified_by: String::new(),
            updated: String::new(),
        }
    }

    #[tokio::test]
    async fn download_writes_artifact_and_checksums() {
        let server =
            MockServer::start(vec![Reply::ok("abc"), Reply::ok("md5sum"), Reply::ok("sha1sum")])
                .await;
        let dir = tempfile::tempdir().unwrap();
        let target = repository(&server.url)
            .download(&deployed("com/example", "foo.jar"), dir.path(), true)
            .await
            .unwrap();

        assert_eq!(target, dir.path().join("com/example/foo.jar"));
        assert_eq!(std::fs::read(&target).unwrap(), b"abc");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("com/example/foo.jar.md5")).unwrap(),
            "md5sum"
        );
        let targets: Vec<String> = server.requests().into_iter().map(|r| r.target).collect();
        assert_eq!(
            targets,
            [
                "/libs-release/com/example/foo.jar",
                "/libs-release/com/example/foo.jar.md5",
                "/libs-release/com/example/foo.jar.sha1",
            ]
        );
    }

    #[tokio::test]
    async fn missing_checksum_companions_are_ignored() {
        let server = MockServer::start(vec![
            Reply::ok("abc"),
            Reply::status(404, ""),
            Reply::status(500, ""),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let target = repository(&server.url)
            .download(&deployed("com/example", "foo.jar"), dir.path(), true)
            .await
            .unwrap();
        assert!(target.exists());
        assert!(!dir.path().join("com/example/foo.jar.md5").exists());
    }

    #[tokio::test]
    async fn download_without_checksums_fetches_once() {
        let server = MockServer::start(vec![Reply::ok("abc")]).await;
        let dir = tempfile::tempdir().unwrap();
        repository(&server.url)
            .download(&deployed(".", "a.txt"), dir.path(), false)
            .await
            .unwrap();
        assert_eq!(server.requests().len(), 1);
        assert!(dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn download_failure_propagates() {
        let server = MockServer::start(vec![Reply::status(403, "")]).await;
        let dir = tempfile::tempdir().unwrap();
        let err = repository(&server.url)
            .download(&deployed("a", "b.jar"), dir.path(), true)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(safe_join(Path::new("/tmp/x"), "../etc/passwd").is_err());
        assert!(safe_join(Path::new("/tmp/x"), "/etc/passwd").is_err());
        assert!(safe_join(Path::new("/tmp/x"), "").is_err());
        assert_eq!(
            safe_join(Path::new("/tmp/x"), "a/b.jar").unwrap(),
            PathBuf::from("/tmp/x/a/b.jar")
        );
    }
}
