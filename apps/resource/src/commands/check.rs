//! `check`: report build runs at or after the current version.

use anyhow::Result;
use artifactory_resource_client::BuildRun;
use artifactory_resource_protocol::{CheckRequest, CheckResponse, Version};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{build_runs, connect};

pub async fn run(request: CheckRequest, cancel: &CancellationToken) -> Result<CheckResponse> {
    let client = connect(&request.source, cancel)?;
    let runs_api = build_runs(&client, &request.source);
    let prefix = request.source.build_number_prefix.as_deref();

    let runs = match request.version.as_ref().and_then(|v| v.started) {
        Some(started) => runs_api.get_started_on_or_after(prefix, started).await?,
        None => runs_api.get_all(prefix).await?,
    };
    let versions = select_versions(runs, request.version.as_ref());
    info!(build = %request.source.build_name, versions = versions.len(), "check complete");
    Ok(versions)
}

/// Orders runs oldest first and keeps the ones a check should report.
///
/// Without a current version only the latest run is reported. With one, the
/// current run and everything after it are reported. An unknown current run
/// with a start time keeps every fetched run, since the query already
/// filtered on that time; without one only the latest run is reported.
fn select_versions(mut runs: Vec<BuildRun>, current: Option<&Version>) -> Vec<Version> {
    runs.sort();
    let position = current.and_then(|current| {
        runs.iter()
            .position(|run| run.build_number == current.build_number)
    });
    let keep_from = match (current, position) {
        (Some(_), Some(position)) => position,
        (Some(current), None) if current.started.is_some() => 0,
        _ => runs.len().saturating_sub(1),
    };
    runs.into_iter()
        .skip(keep_from)
        .map(|run| Version::new(run.build_number, run.started))
        .collect()
}
