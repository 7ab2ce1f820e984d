//! CLI argument parsing for semgate.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Semgate: run a command only while a leased lock on a key is held.
///
/// Leases live as files in a shared lock directory, so independent
/// processes on the same host coordinate without talking to each other.
#[derive(Parser, Debug)]
#[command(name = "semgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (default: ./semgate.yaml if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log state transitions and lease renewals.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for semgate.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding a lease on a key.
    ///
    /// If every lease on the key is taken the command is skipped. While
    /// the command runs its lease is renewed; when it exits the lease is
    /// released.
    Run(RunArgs),

    /// Inspect or clear leases in the lock directory.
    Locks(LocksCommand),
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The lock key contenders share.
    #[arg(long, short)]
    pub key: String,

    /// Lease timeout in seconds (default from settings).
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// How many runs may hold the key at once (default from settings).
    #[arg(long = "max-holders", short = 'n')]
    pub max_holders: Option<u32>,

    /// Command line to run, split with shell quoting rules (no shell).
    #[arg(long, short, conflicts_with = "argv")]
    pub command: Option<String>,

    /// Exit non-zero when the lock is not acquired or the command fails.
    #[arg(long)]
    pub strict: bool,

    /// Command and arguments to run, after `--`.
    #[arg(last = true)]
    pub argv: Vec<String>,
}

/// Lock management commands.
#[derive(Args, Debug)]
pub struct LocksCommand {
    #[command(subcommand)]
    pub action: LocksAction,
}

#[derive(Subcommand, Debug)]
pub enum LocksAction {
    /// List leases in the lock directory.
    List,

    /// Remove a lease, or every expired lease.
    Clear(ClearArgs),
}

/// Arguments for `locks clear`.
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Key of the lease to remove.
    #[arg(required_unless_present = "expired", conflicts_with = "expired")]
    pub key: Option<String>,

    /// Slot of the lease to remove.
    #[arg(long, default_value_t = 0)]
    pub slot: u32,

    /// Remove every expired lease instead.
    #[arg(long)]
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "semgate", "run", "--key", "job-A", "--timeout", "9", "--", "echo", "hi",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.key, "job-A");
        assert_eq!(args.timeout, Some(9));
        assert_eq!(args.max_holders, None);
        assert_eq!(args.argv, vec!["echo", "hi"]);
        assert!(!args.strict);
    }

    #[test]
    fn parses_run_with_command_string() {
        let cli = Cli::try_parse_from([
            "semgate",
            "run",
            "-k",
            "job-A",
            "-n",
            "2",
            "--strict",
            "--command",
            "echo 'hello world'",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.max_holders, Some(2));
        assert_eq!(args.command.as_deref(), Some("echo 'hello world'"));
        assert!(args.strict);
    }

    #[test]
    fn command_string_conflicts_with_trailing_args() {
        let result = Cli::try_parse_from([
            "semgate", "run", "-k", "job-A", "--command", "true", "--", "false",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn clear_needs_key_or_expired() {
        assert!(Cli::try_parse_from(["semgate", "locks", "clear"]).is_err());
        assert!(Cli::try_parse_from(["semgate", "locks", "clear", "--expired"]).is_ok());
        assert!(Cli::try_parse_from(["semgate", "locks", "clear", "job-A", "--slot", "1"]).is_ok());
        assert!(Cli::try_parse_from(["semgate", "locks", "clear", "job-A", "--expired"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["semgate", "locks", "list", "-v", "--config", "x.yaml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
    }
}
