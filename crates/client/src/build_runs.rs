//! Build-run queries and build-info publication.
//!
//! Two query strategies exist. [`AqlSearch`] runs a single server-side AQL
//! search and needs admin rights. [`Listing`] works for any user: it lists
//! every run of the build and filters on the client.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{ArtifactoryClient, encode_segment as encode};
use crate::error::ArtifactoryError;
use crate::types::{BuildInfo, BuildRun, DeployedArtifact};

/// Server timestamp format, e.g. `2017-10-05T19:40:31.000+0000`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Formats a timestamp the way the server writes them.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a server timestamp, also accepting RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ArtifactoryError> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ArtifactoryError::Timestamp(value.to_string()))
}

type QueryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<BuildRun>, ArtifactoryError>> + Send + 'a>>;

/// What to look for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRunQuery {
    pub prefix: Option<String>,
    pub started_on_or_after: Option<DateTime<Utc>>,
}

/// Build-run lookup strategy.
pub trait BuildRunsStrategy: Send + Sync {
    fn find<'a>(
        &'a self,
        client: &'a ArtifactoryClient,
        config: &'a BuildRunsConfig,
        query: &'a BuildRunQuery,
    ) -> QueryFuture<'a>;
}

/// Which build to query and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRunsConfig {
    pub build_name: String,
    pub project: Option<String>,
    /// Use server-side AQL search. Requires admin credentials.
    pub admin: bool,
    /// Keep only the most recent runs.
    pub limit: Option<usize>,
}

/// Build runs of one named build.
pub struct BuildRuns {
    client: ArtifactoryClient,
    config: BuildRunsConfig,
    strategy: Box<dyn BuildRunsStrategy>,
}

impl BuildRuns {
    pub(crate) fn new(client: ArtifactoryClient, config: BuildRunsConfig) -> Self {
        let strategy: Box<dyn BuildRunsStrategy> = if config.admin {
            Box::new(AqlSearch)
        } else {
            Box::new(Listing)
        };
        Self {
            client,
            config,
            strategy,
        }
    }

    pub fn config(&self) -> &BuildRunsConfig {
        &self.config
    }

    /// All runs whose build number starts with `prefix` (all runs when
    /// `None`).
    pub async fn get_all(&self, prefix: Option<&str>) -> Result<Vec<BuildRun>, ArtifactoryError> {
        let query = BuildRunQuery {
            prefix: prefix.map(str::to_string),
            started_on_or_after: None,
        };
        self.find(&query).await
    }

    /// Runs started at or after `timestamp`.
    pub async fn get_started_on_or_after(
        &self,
        prefix: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<BuildRun>, ArtifactoryError> {
        let query = BuildRunQuery {
            prefix: prefix.map(str::to_string),
            started_on_or_after: Some(timestamp),
        };
        self.find(&query).await
    }

    async fn find(&self, query: &BuildRunQuery) -> Result<Vec<BuildRun>, ArtifactoryError> {
        let runs = self.strategy.find(&self.client, &self.config, query).await?;
        debug!(build = %self.config.build_name, runs = runs.len(), "build runs found");
        Ok(runs)
    }

    /// Artifacts recorded against one build run.
    pub async fn get_deployed_artifacts(
        &self,
        build_number: &str,
    ) -> Result<Vec<DeployedArtifact>, ArtifactoryError> {
        let aql = deployed_artifacts_aql(&self.config.build_name, build_number);
        let body = post_aql(&self.client, aql).await?;
        let results: AqlResults<DeployedArtifact> = serde_json::from_slice(&body)?;
        debug!(build_number, artifacts = results.results.len(), "deployed artifacts found");
        Ok(results.results)
    }

    /// Raw build-info JSON of one run.
    pub async fn get_raw_build_info(&self, build_number: &str) -> Result<String, ArtifactoryError> {
        let endpoint = format!(
            "/api/build/{}/{}",
            encode(&self.config.build_name),
            encode(build_number)
        );
        let request = with_project(
            self.client.http().get(self.client.url(&endpoint)),
            &self.config.project,
        );
        let resp = self.client.send(request).await?;
        Ok(resp.text().await?)
    }

    /// Publishes a build-info document.
    pub async fn add(&self, build_info: &BuildInfo) -> Result<(), ArtifactoryError> {
        let request = with_project(
            self.client.http().put(self.client.url("/api/build")),
            &self.config.project,
        )
        .json(build_info);
        self.client.send(request).await?;
        info!(build = %build_info.name, number = %build_info.number, "build info published");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AQL search (admin)
// ---------------------------------------------------------------------------

/// Server-side search with `builds.find(...)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AqlSearch;

#[derive(Debug, Deserialize)]
struct AqlResults<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AqlBuild {
    #[serde(rename = "build.number")]
    number: String,
    #[serde(rename = "build.started")]
    started: String,
}

impl BuildRunsStrategy for AqlSearch {
    fn find<'a>(
        &'a self,
        client: &'a ArtifactoryClient,
        config: &'a BuildRunsConfig,
        query: &'a BuildRunQuery,
    ) -> QueryFuture<'a> {
        Box::pin(search_builds(client, config, query))
    }
}

async fn search_builds(
    client: &ArtifactoryClient,
    config: &BuildRunsConfig,
    query: &BuildRunQuery,
) -> Result<Vec<BuildRun>, ArtifactoryError> {
    let aql = builds_aql(&config.build_name, query, config.limit);
    let body = post_aql(client, aql).await?;
    let results: AqlResults<AqlBuild> = serde_json::from_slice(&body)?;
    results
        .results
        .into_iter()
        .map(|b| Ok(BuildRun::new(b.number, parse_timestamp(&b.started)?)))
        .collect()
}

pub(crate) fn builds_aql(build_name: &str, query: &BuildRunQuery, limit: Option<usize>) -> String {
    let mut criteria = vec![format!("\"name\":{}", quote(build_name))];
    if let Some(started) = query.started_on_or_after {
        criteria.push(format!(
            "\"started\":{{\"$gte\":{}}}",
            quote(&format_timestamp(started))
        ));
    }
    if let Some(prefix) = &query.prefix {
        criteria.push(format!("\"number\":{{\"$match\":{}}}", quote(&format!("{prefix}*"))));
    }
    let mut aql = format!(
        "builds.find({{{}}}).include(\"name\",\"number\",\"started\")",
        criteria.join(",")
    );
    if let Some(limit) = limit {
        aql.push_str(&format!(".sort({{\"$desc\":[\"started\"]}}).limit({limit})"));
    }
    aql
}

pub(crate) fn deployed_artifacts_aql(build_name: &str, build_number: &str) -> String {
    format!(
        "items.find({{\"@build.name\":{},\"@build.number\":{}}})",
        quote(build_name),
        quote(build_number)
    )
}

async fn post_aql(client: &ArtifactoryClient, aql: String) -> Result<Vec<u8>, ArtifactoryError> {
    debug!(aql = %aql, "AQL search");
    let request = client
        .http()
        .post(client.url("/api/search/aql"))
        .header(CONTENT_TYPE, "text/plain")
        .body(aql);
    let resp = client.send(request).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// JSON string literal.
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

// ---------------------------------------------------------------------------
// Listing (any user)
// ---------------------------------------------------------------------------

/// Lists every run with `GET /api/build/{name}` and filters locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct Listing;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildListing {
    #[serde(default)]
    builds_numbers: Vec<ListedBuild>,
}

#[derive(Debug, Deserialize)]
struct ListedBuild {
    uri: String,
    started: String,
}

impl BuildRunsStrategy for Listing {
    fn find<'a>(
        &'a self,
        client: &'a ArtifactoryClient,
        config: &'a BuildRunsConfig,
        query: &'a BuildRunQuery,
    ) -> QueryFuture<'a> {
        Box::pin(async move {
            let runs = list_runs(client, config).await?;
            Ok::<_, ArtifactoryError>(filter_runs(runs, query, config.limit))
        })
    }
}

async fn list_runs(
    client: &ArtifactoryClient,
    config: &BuildRunsConfig,
) -> Result<Vec<BuildRun>, ArtifactoryError> {
    let endpoint = format!("/api/build/{}", encode(&config.build_name));
    let request = with_project(client.http().get(client.url(&endpoint)), &config.project);
    let resp = match client.send(request).await {
        Ok(resp) => resp,
        Err(err) if err.status() == Some(404) => {
            debug!(build = %config.build_name, "build has no runs");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };
    let listing: BuildListing = serde_json::from_slice(&resp.bytes().await?)?;
    listing
        .builds_numbers
        .into_iter()
        .map(|b| {
            let number = b.uri.trim_start_matches('/');
            let number = percent_decode_str(number).decode_utf8_lossy().into_owned();
            Ok(BuildRun::new(number, parse_timestamp(&b.started)?))
        })
        .collect()
}

/// Applies the limit (most recent first) and then the query filters.
pub(crate) fn filter_runs(
    mut runs: Vec<BuildRun>,
    query: &BuildRunQuery,
    limit: Option<usize>,
) -> Vec<BuildRun> {
    if let Some(limit) = limit {
        runs.sort_by(|a, b| b.cmp(a));
        runs.truncate(limit);
    }
    runs.retain(|run| {
        query
            .prefix
            .as_deref()
            .is_none_or(|prefix| run.build_number.starts_with(prefix))
            && query
                .started_on_or_after
                .is_none_or(|started| run.started >= started)
    });
    runs
}

fn with_project(
    request: reqwest::RequestBuilder,
    project: &Option<String>,
) -> reqwest::RequestBuilder {
    match project {
        Some(project) => request.query(&[("project", project)]),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::{MockServer, Reply};

    fn at(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    fn run(number: &str, started: &str) -> BuildRun {
        BuildRun::new(number, at(started))
    }

    fn numbers(runs: &[BuildRun]) -> Vec<&str> {
        runs.iter().map(|r| r.build_number.as_str()).collect()
    }

    fn build_runs(url: &str, admin: bool, limit: Option<usize>) -> BuildRuns {
        ArtifactoryClient::new(url, "admin", "password")
            .unwrap()
            .build_runs(BuildRunsConfig {
                build_name: "my-build".into(),
                project: None,
                admin,
                limit,
            })
    }

    #[test]
    fn timestamp_round_trip() {
        let t = at("2017-10-05T19:40:31.000+0000");
        assert_eq!(format_timestamp(t), "2017-10-05T19:40:31.000+0000");
        assert_eq!(at("2017-10-05T19:40:31Z"), t);
        assert_eq!(at("2017-10-05T21:40:31.000+0200"), t);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ArtifactoryError::Timestamp(_))
        ));
    }

    #[test]
    fn aql_name_only() {
        assert_eq!(
            builds_aql("my-build", &BuildRunQuery::default(), None),
            r#"builds.find({"name":"my-build"}).include("name","number","started")"#
        );
    }

    #[test]
    fn aql_with_all_filters_and_limit() {
        let query = BuildRunQuery {
            prefix: Some("1.".into()),
            started_on_or_after: Some(at("2017-10-05T19:40:31.000+0000")),
        };
        assert_eq!(
            builds_aql("my-build", &query, Some(5)),
            concat!(
                r#"builds.find({"name":"my-build","started":{"$gte":"2017-10-05T19:40:31.000+0000"},"number":{"$match":"1.*"}})"#,
                r#".include("name","number","started").sort({"$desc":["started"]}).limit(5)"#
            )
        );
    }

    #[test]
    fn aql_prefix_only() {
        let query = BuildRunQuery {
            prefix: Some("rc-".into()),
            started_on_or_after: None,
        };
        assert_eq!(
            builds_aql("b", &query, None),
            r#"builds.find({"name":"b","number":{"$match":"rc-*"}}).include("name","number","started")"#
        );
    }

    #[test]
    fn aql_quotes_names() {
        assert_eq!(
            deployed_artifacts_aql("my \"build\"", "42"),
            r#"items.find({"@build.name":"my \"build\"","@build.number":"42"})"#
        );
    }

    #[test]
    fn listing_filters_by_prefix_and_start() {
        let runs = vec![
            run("1", "2020-01-01T00:00:00Z"),
            run("2", "2020-01-02T00:00:00Z"),
            run("10", "2020-01-03T00:00:00Z"),
        ];
        let query = BuildRunQuery {
            prefix: Some("1".into()),
            started_on_or_after: Some(at("2020-01-01T00:00:00Z")),
        };
        assert_eq!(numbers(&filter_runs(runs.clone(), &query, None)), ["1", "10"]);

        let query = BuildRunQuery {
            prefix: None,
            started_on_or_after: Some(at("2020-01-02T00:00:00Z")),
        };
        assert_eq!(numbers(&filter_runs(runs, &query, None)), ["2", "10"]);
    }

    #[test]
    fn listing_limit_applies_before_filters() {
        let runs = vec![
            run("a1", "2020-01-01T00:00:00Z"),
            run("b2", "2020-01-02T00:00:00Z"),
            run("a3", "2020-01-03T00:00:00Z"),
        ];
        let query = BuildRunQuery {
            prefix: Some("a".into()),
            started_on_or_after: None,
        };
        // The two most recent are a3 and b2; only a3 survives the prefix.
        assert_eq!(numbers(&filter_runs(runs, &query, Some(2))), ["a3"]);
    }

    #[test]
    fn listing_without_filters_or_limit_keeps_input() {
        let runs = vec![run("2", "2020-01-02T00:00:00Z"), run("1", "2020-01-01T00:00:00Z")];
        assert_eq!(
            numbers(&filter_runs(runs, &BuildRunQuery::default(), None)),
            ["2", "1"]
        );
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let runs = vec![run("RC1", "2020-01-01T00:00:00Z")];
        let query = BuildRunQuery {
            prefix: Some("rc".into()),
            started_on_or_after: None,
        };
        assert!(filter_runs(runs, &query, None).is_empty());
    }

    #[tokio::test]
    async fn admin_uses_aql() {
        let server = MockServer::start(vec![Reply::json(
            r#"{"results":[
                {"build.name":"my-build","build.number":"2","build.started":"2020-01-02T00:00:00.000+0000"},
                {"build.name":"my-build","build.number":"1","build.started":"2020-01-01T00:00:00.000+0000"}
            ],"range":{"start_pos":0,"end_pos":2,"total":2}}"#,
        )])
        .await;
        let runs = build_runs(&server.url, true, Some(2)).get_all(None).await.unwrap();
        assert_eq!(numbers(&runs), ["2", "1"]);

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/api/search/aql");
        assert_eq!(requests[0].header("content-type"), Some("text/plain"));
        assert!(requests[0].body_text().ends_with(".limit(2)"));
    }

    #[tokio::test]
    async fn non_admin_lists_and_filters() {
        let server = MockServer::start(vec![Reply::json(
            r#"{"uri":"http://x/api/build/my-build","buildsNumbers":[
                {"uri":"/1","started":"2020-01-01T00:00:00.000+0000"},
                {"uri":"/2","started":"2020-01-02T00:00:00.000+0000"},
                {"uri":"/1.0%2Brc","started":"2020-01-03T00:00:00.000+0000"}
            ]}"#,
        )])
        .await;
        let runs = build_runs(&server.url, false, None)
            .get_started_on_or_after(Some("1"), at("2020-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(numbers(&runs), ["1", "1.0+rc"]);

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].target, "/api/build/my-build");
    }

    #[tokio::test]
    async fn non_admin_limit_without_filters_keeps_latest() {
        let server = MockServer::start(vec![Reply::json(
            r#"{"uri":"http://x/api/build/my-build","buildsNumbers":[
                {"uri":"/1","started":"2020-01-01T00:00:00.000+0000"},
                {"uri":"/2","started":"2020-01-02T00:00:00.000+0000"}
            ]}"#,
        )])
        .await;
        let runs = build_runs(&server.url, false, Some(1)).get_all(None).await.unwrap();
        assert_eq!(numbers(&runs), ["2"]);
        assert_eq!(runs[0].started, at("2020-01-02T00:00:00Z"));
    }

    #[test]
    fn listing_limit_without_filters_sorts_and_truncates() {
        let runs = vec![
            run("1", "2020-01-01T00:00:00Z"),
            run("3", "2020-01-03T00:00:00Z"),
            run("2", "2020-01-02T00:00:00Z"),
        ];
        assert_eq!(
            numbers(&filter_runs(runs, &BuildRunQuery::default(), Some(2))),
            ["3", "2"]
        );
    }

    #[tokio::test]
    async fn listing_404_means_no_runs() {
        let server = MockServer::start(vec![Reply::status(404, "")]).await;
        let runs = build_runs(&server.url, false, None).get_all(None).await.unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn listing_other_errors_propagate() {
        let server = MockServer::start(vec![Reply::status(401, "")]).await;
        let err = build_runs(&server.url, false, None).get_all(None).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn project_is_sent_as_query() {
        let server = MockServer::start(vec![Reply::json(r#"{"buildsNumbers":[]}"#)]).await;
        let runs = ArtifactoryClient::new(&server.url, "", "")
            .unwrap()
            .build_runs(BuildRunsConfig {
                build_name: "b".into(),
                project: Some("proj".into()),
                admin: false,
                limit: None,
            });
        runs.get_all(None).await.unwrap();
        assert_eq!(server.requests()[0].target, "/api/build/b?project=proj");
    }

    #[tokio::test]
    async fn deployed_artifacts_via_aql() {
        let server = MockServer::start(vec![Reply::json(
            r#"{"results":[{"repo":"libs","path":"com/example","name":"foo.jar","type":"file","size":3}]}"#,
        )])
        .await;
        let artifacts = build_runs(&server.url, false, None)
            .get_deployed_artifacts("42")
            .await
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "foo.jar");
        assert_eq!(
            server.requests()[0].body_text(),
            r#"items.find({"@build.name":"my-build","@build.number":"42"})"#
        );
    }

    #[tokio::test]
    async fn raw_build_info_is_returned_untouched() {
        let body = r#"{"buildInfo":{"name":"my-build","number":"42"}}"#;
        let server = MockServer::start(vec![Reply::json(body)]).await;
        let raw = build_runs(&server.url, false, None)
            .get_raw_build_info("42")
            .await
            .unwrap();
        assert_eq!(raw, body);
        assert_eq!(server.requests()[0].target, "/api/build/my-build/42");
    }

    #[tokio::test]
    async fn add_puts_build_info() {
        let server = MockServer::start(vec![Reply::status(204, "")]).await;
        let info = BuildInfo::new(
            "my-build",
            "42",
            at("2020-01-01T00:00:00Z"),
            crate::types::BuildAgent {
                name: "artifactory-resource".into(),
                version: "0.1.0".into(),
            },
        );
        build_runs(&server.url, false, None).add(&info).await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(request.method, "PUT");
        assert_eq!(request.target, "/api/build");
        let sent: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent["name"], "my-build");
        assert_eq!(sent["started"], "2020-01-01T00:00:00.000+0000");
    }
}
