//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Discover ads.txt and app-ads.txt disclosures for websites and mobile apps.
///
/// Each target line is classified, resolved to its developer site when it is
/// an app, and the disclosure file is fetched and searched for the requested
/// seller lines.
#[derive(Parser, Debug)]
#[command(name = "adscout")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/adscout/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch disclosure files and write the results report
    Scan(ScanArgs),
    /// Resolve app targets and store their metadata
    SyncApps(SyncArgs),
}

/// Arguments for `adscout scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// File with one target per line (domain, store URL or bundle id)
    #[arg(short, long, value_name = "FILE")]
    pub targets: PathBuf,

    /// File with one search column label per line
    #[arg(short = 'k', long, value_name = "FILE")]
    pub columns: PathBuf,

    /// Results CSV path
    #[arg(short, long, default_value = "results.csv")]
    pub output: PathBuf,

    /// Failed targets list path
    #[arg(short, long, default_value = "failed.txt")]
    pub failed: PathBuf,

    /// Report True/False per column instead of the matching lines
    #[arg(long)]
    pub presence: bool,

    /// Maximum concurrent targets (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Extra attempts per target after a transient failure (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: Option<u8>,

    /// Minimum non-blank lines before columns are extracted
    #[arg(long)]
    pub min_lines: Option<usize>,

    /// Directory for cached disclosure files, kept after the run
    /// (default: a temporary directory removed on exit)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for `adscout sync-apps`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// File with one target per line; non-app targets are skipped
    #[arg(short, long, value_name = "FILE")]
    pub targets: PathBuf,

    /// `SQLite` database path
    #[arg(long, default_value = "adscout.db")]
    pub db: PathBuf,

    /// Look up apps that are already stored
    #[arg(long)]
    pub force: bool,

    /// Only look up apps that are not stored yet
    #[arg(long)]
    pub only_new_apps: bool,

    /// Maximum concurrent lookups (1-100)
    #[arg(short = 'c', long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_scan_parses_required_args() {
        let cli = Cli::try_parse_from(["adscout", "scan", "-t", "in.txt", "-k", "cols.txt"]).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.targets, PathBuf::from("in.txt"));
        assert_eq!(args.columns, PathBuf::from("cols.txt"));
        assert_eq!(args.output, PathBuf::from("results.csv"));
        assert_eq!(args.failed, PathBuf::from("failed.txt"));
        assert!(args.concurrency.is_none());
        assert!(!args.presence);
    }

    #[test]
    fn test_cli_scan_requires_targets() {
        let result = Cli::try_parse_from(["adscout", "scan", "-k", "cols.txt"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let cli = Cli::try_parse_from(["adscout", "scan", "-t", "a", "-k", "b", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["adscout", "-q", "sync-apps", "-t", "a"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert!(Cli::try_parse_from(["adscout", "scan", "-t", "a", "-k", "b", "-c", "0"]).is_err());
        assert!(Cli::try_parse_from(["adscout", "scan", "-t", "a", "-k", "b", "-c", "101"]).is_err());
        let cli = Cli::try_parse_from(["adscout", "scan", "-t", "a", "-k", "b", "-c", "100"]).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.concurrency, Some(100));
    }

    #[test]
    fn test_cli_sync_apps_flags() {
        let cli = Cli::try_parse_from([
            "adscout",
            "sync-apps",
            "-t",
            "apps.txt",
            "--db",
            "x.db",
            "--force",
            "--only-new-apps",
        ])
        .unwrap();
        let Command::SyncApps(args) = cli.command else {
            panic!("expected sync-apps");
        };
        assert_eq!(args.db, PathBuf::from("x.db"));
        assert!(args.force);
        assert!(args.only_new_apps);
        assert_eq!(args.concurrency, 4);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Cli::try_parse_from(["adscout", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["adscout"]).is_err());
    }
}
