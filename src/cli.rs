//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use doi_transfer_core::DestinationSpec;

/// Resolve dataset DOIs and stage their files for transfer.
///
/// doi-transfer finds the repository behind a DOI, lists the record's files
/// and projects them onto destination storages as a transfer job.
#[derive(Parser, Debug)]
#[command(name = "doi-transfer")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (defaults to the XDG config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a DOI and print the projected transfer job as JSON
    Resolve(JobArgs),

    /// Resolve a DOI and submit the transfer job to the backend
    Stage {
        #[command(flatten)]
        job: JobArgs,

        /// Access token for the transfer backend
        #[arg(long, env = "DOI_TRANSFER_TOKEN", hide_env_values = true)]
        token: Option<AccessToken>,
    },
}

/// Transfer backend token; `Debug` never prints the value.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Arguments shared by `resolve` and `stage`.
#[derive(ClapArgs, Debug)]
pub struct JobArgs {
    /// DOI to resolve (bare, doi: prefixed or a DOI URL)
    #[arg(long)]
    pub doi: String,

    /// Destination base URL; repeat for several storages
    #[arg(long = "dest", required = true)]
    pub destinations: Vec<String>,

    /// Only report hosts of destinations using this scheme
    #[arg(long)]
    pub protocol: Option<String>,

    /// Ask the backend to verify checksums after copying
    #[arg(long)]
    pub verify_checksum: bool,

    /// Overwrite files that already exist at the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Backend retry count per file (0-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retry: Option<u32>,

    /// Backend job priority (1-5)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub priority: Option<u8>,
}

impl JobArgs {
    /// Builds the destination spec for the pipeline.
    #[must_use]
    pub fn destination_spec(&self) -> DestinationSpec {
        let mut spec = DestinationSpec::new(self.destinations.iter().cloned());
        spec.protocol.clone_from(&self.protocol);
        spec.verify_checksum = self.verify_checksum;
        spec.overwrite = self.overwrite;
        spec.retry = self.retry;
        spec.priority = self.priority;
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(args: &Args) -> &JobArgs {
        match &args.command {
            Command::Resolve(job) | Command::Stage { job, .. } => job,
        }
    }

    #[test]
    fn test_cli_resolve_parses_successfully() {
        let args = Args::try_parse_from([
            "doi-transfer",
            "resolve",
            "--doi",
            "10.5281/zenodo.42",
            "--dest",
            "s3://bucket/in",
        ])
        .unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(matches!(args.command, Command::Resolve(_)));
        assert_eq!(job(&args).doi, "10.5281/zenodo.42");
        assert_eq!(job(&args).destinations, vec!["s3://bucket/in"]);
    }

    #[test]
    fn test_cli_multiple_destinations_keep_order() {
        let args = Args::try_parse_from([
            "doi-transfer",
            "resolve",
            "--doi",
            "10.1/x",
            "--dest",
            "s3://b/in",
            "--dest",
            "ftp://f.example.org/in",
            "--protocol",
            "s3",
        ])
        .unwrap();
        let spec = job(&args).destination_spec();
        assert_eq!(spec.destinations, vec!["s3://b/in", "ftp://f.example.org/in"]);
        assert_eq!(spec.protocol.as_deref(), Some("s3"));
    }

    #[test]
    fn test_cli_destination_required() {
        let result = Args::try_parse_from(["doi-transfer", "resolve", "--doi", "10.1/x"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_subcommand_required() {
        let result = Args::try_parse_from(["doi-transfer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "doi-transfer",
            "resolve",
            "--doi",
            "10.1/x",
            "--dest",
            "s3://b/in",
            "-vv",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_cli_stage_token_flag() {
        let args = Args::try_parse_from([
            "doi-transfer",
            "stage",
            "--doi",
            "10.1/x",
            "--dest",
            "s3://b/in",
            "--token",
            "abc",
            "--retry",
            "3",
            "--priority",
            "2",
            "--verify-checksum",
        ])
        .unwrap();
        let Command::Stage { job, token } = &args.command else {
            panic!("expected stage");
        };
        assert_eq!(token.clone().map(AccessToken::into_inner).as_deref(), Some("abc"));
        let spec = job.destination_spec();
        assert_eq!(spec.retry, Some(3));
        assert_eq!(spec.priority, Some(2));
        assert!(spec.verify_checksum);
        assert!(!spec.overwrite);
    }

    #[test]
    fn test_cli_debug_output_redacts_token() {
        let args = Args::try_parse_from([
            "doi-transfer",
            "stage",
            "--doi",
            "10.1/x",
            "--dest",
            "s3://b/in",
            "--token",
            "SECRET-TOKEN-42",
        ])
        .unwrap();
        let rendered = format!("{args:?}");
        assert!(!rendered.contains("SECRET-TOKEN-42"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_cli_priority_out_of_range_rejected() {
        let result = Args::try_parse_from([
            "doi-transfer",
            "resolve",
            "--doi",
            "10.1/x",
            "--dest",
            "s3://b/in",
            "--priority",
            "9",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["doi-transfer", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["doi-transfer", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["doi-transfer", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
