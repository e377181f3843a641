//! Artifactory CI resource.
//!
//! Usage:
//!   artifactory-resource check       # list new build runs
//!   artifactory-resource in <dir>    # fetch a build run's artifacts
//!   artifactory-resource out <dir>   # deploy artifacts as a new build run
//!
//! Each command reads its JSON request from stdin and writes its JSON
//! response to stdout. Logs go to stderr; set `RUST_LOG` to adjust them.

mod commands;
mod error;
mod input;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::input::{INPUT_TIMEOUT, read_request};

#[derive(Parser)]
#[command(name = "artifactory-resource")]
#[command(about = "Publish and fetch build artifacts on an Artifactory server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report build runs newer than the given version
    Check,

    /// Download the artifacts of a build run into a directory
    In {
        /// Destination directory
        dir: PathBuf,
    },

    /// Deploy artifacts from a directory as a new build run
    Out {
        /// Source directory; `params.folder` is relative to it
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping");
            interrupt.cancel();
        }
    });

    // A command waiting out a retry delay sees the cancellation first and
    // fails with its own error.
    let output = tokio::select! {
        biased;
        output = execute(cli.command, &cancel) => output?,
        _ = cancel.cancelled() => bail!("interrupted"),
    };

    println!("{output}");
    Ok(())
}

/// Runs one command and returns its JSON response.
async fn execute(command: Command, cancel: &CancellationToken) -> Result<String> {
    let stdin = tokio::io::stdin();
    let output = match command {
        Command::Check => {
            let request = read_request(stdin, INPUT_TIMEOUT).await?;
            let response = commands::check::run(request, cancel).await.context("check failed")?;
            serde_json::to_string(&response)?
        }
        Command::In { dir } => {
            let request = read_request(stdin, INPUT_TIMEOUT).await?;
            let response = commands::get::run(&dir, request, cancel).await.context("in failed")?;
            serde_json::to_string(&response)?
        }
        Command::Out { dir } => {
            let request = read_request(stdin, INPUT_TIMEOUT).await?;
            let response = commands::put::run(&dir, request, chrono::Utc::now(), cancel)
                .await
                .context("out failed")?;
            serde_json::to_string(&response)?
        }
    };
    Ok(output)
}
