//! CLI entry point for the doi-transfer tool.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use doi_transfer_core::config::resolve_default_config_path;
use doi_transfer_core::{DoiResolutionRequest, PipelineError, StagingConfig, StagingPipeline};
use serde::Serialize;
use tracing::{debug, info};

mod cli;

use cli::{AccessToken, Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries JSON results only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = load_config(args.config.as_deref())?;
    let pipeline =
        StagingPipeline::from_config(&config).context("failed to initialize staging pipeline")?;

    match args.command {
        Command::Resolve(job) => {
            let request = DoiResolutionRequest::new(&job.doi);
            info!(doi = %request.doi, "Resolving DOI");
            let outcome = pipeline.resolve(&request, &job.destination_spec()).await;
            emit(&request.doi, outcome)
        }
        Command::Stage { job, token } => {
            let mut request = DoiResolutionRequest::new(&job.doi);
            request.access_token = token.map(AccessToken::into_inner);
            info!(doi = %request.doi, "Staging DOI");
            let outcome = pipeline.stage(&request, &job.destination_spec()).await;
            emit(&request.doi, outcome)
        }
    }
}

/// Loads the explicit config file, else the default one if present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<StagingConfig> {
    if let Some(path) = explicit {
        return StagingConfig::load(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()));
    }

    match resolve_default_config_path() {
        Some(path) if path.is_file() => {
            debug!(path = %path.display(), "Loading default config file");
            StagingConfig::load(&path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))
        }
        _ => {
            debug!("No config file; using built-in defaults");
            Ok(StagingConfig::default())
        }
    }
}

/// Prints the result (or the error report) as JSON on stdout.
fn emit<T: Serialize>(doi: &str, outcome: Result<T, PipelineError>) -> Result<()> {
    match outcome {
        Ok(value) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("failed to encode result")?
            );
            Ok(())
        }
        Err(error) => {
            let report = error.report(doi);
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to encode error report")?
            );
            Err(anyhow::Error::new(error).context(format!("{} for DOI '{doi}'", report.kind)))
        }
    }
}
