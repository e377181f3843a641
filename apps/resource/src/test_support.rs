//! Fixtures for command tests.

pub(crate) use artifactory_resource_client::mock_server::{MockServer, Reply};

/// Source JSON pointing at `url`.
pub(crate) fn source_json(url: &str) -> String {
    format!(
        r#"{{"uri":"{url}","username":"admin","password":"secret","build_name":"my-build"}}"#
    )
}

/// A server that accepts every upload with `201 Created`.
pub(crate) async fn accepting_server() -> MockServer {
    MockServer::start_with_fallback(Vec::new(), Reply::status(201, "")).await
}
