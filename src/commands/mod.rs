//! Command implementations for semgate.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command returns the process exit code on success.

mod locks;
mod run;

use crate::cli::{Cli, Command, LocksAction};
use semgate::config::{DEFAULT_CONFIG_FILE, Settings};
use semgate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Command::Run(args) => run::cmd_run(args, &settings),
        Command::Locks(locks_cmd) => match locks_cmd.action {
            LocksAction::List => locks::cmd_locks_list(&settings),
            LocksAction::Clear(args) => locks::cmd_locks_clear(args, &settings),
        },
    }
}

/// An explicit `--config` must exist; the default file is optional.
fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::load_or_default(DEFAULT_CONFIG_FILE),
    }
}
