//! Implementation of the `semgate run` command.
//!
//! The command line becomes the work unit: it is spawned as a child process
//! once the lease is held, polled every `poll_interval_ms`, and each poll
//! that finds it still running signals progress. If a renewal reports the
//! lease lost, the child is killed.

use crate::cli::RunArgs;
use anyhow::{Context, bail};
use semgate::config::Settings;
use semgate::error::{GateError, Result};
use semgate::exit_codes;
use semgate::gate::{GatedRunner, RunOutcome, RunnerConfig, WorkUnit};
use semgate::progress::{ProgressSignal, Throttle};
use semgate::semaphore::FileSemaphore;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

/// Execute the `semgate run` command.
pub fn cmd_run(args: RunArgs, settings: &Settings) -> Result<i32> {
    let argv = resolve_argv(&args)?;
    FileSemaphore::validate_key(&args.key)?;

    let timeout = args.timeout.unwrap_or(settings.default_lock_timeout_secs);
    let max_holders = args.max_holders.unwrap_or(settings.default_max_lock_count);
    let poll = settings.poll_interval();

    let renew_every = Throttle::for_lease(timeout).min_interval();
    if poll > renew_every {
        tracing::warn!(
            poll_ms = poll.as_millis() as u64,
            renew_ms = renew_every.as_millis() as u64,
            "poll interval is longer than the renewal interval; the lease may lapse"
        );
    }

    let config = RunnerConfig::builder()
        .work(ChildProcess::new(argv, poll))
        .lock_key(args.key.as_str())
        .lock_timeout_secs(timeout)
        .max_lock_count(max_holders)
        .build()?;
    let semaphore = FileSemaphore::new(&settings.lock_dir);

    let outcome = GatedRunner::new(semaphore, config).run()?;
    Ok(exit_code_for(&outcome, args.strict))
}

fn resolve_argv(args: &RunArgs) -> Result<Vec<String>> {
    let argv = match &args.command {
        Some(line) => shell_words::split(line).map_err(|e| {
            GateError::UserError(format!("failed to parse --command '{}': {}", line, e))
        })?,
        None => args.argv.clone(),
    };

    if argv.is_empty() {
        return Err(GateError::UserError(
            "no command given; pass --command or arguments after `--`".to_string(),
        ));
    }
    Ok(argv)
}

fn exit_code_for(outcome: &RunOutcome, strict: bool) -> i32 {
    if !strict {
        return exit_codes::SUCCESS;
    }
    match outcome {
        RunOutcome::Completed { .. } => exit_codes::SUCCESS,
        RunOutcome::NotAcquired => exit_codes::NOT_ACQUIRED,
        RunOutcome::AcquireFailed { .. } => exit_codes::LOCK_FAILURE,
        RunOutcome::WorkFailed { .. } => exit_codes::WORK_FAILURE,
    }
}

/// A child process run as a work unit.
struct ChildProcess {
    argv: Vec<String>,
    poll: Duration,
}

impl ChildProcess {
    fn new(argv: Vec<String>, poll: Duration) -> Self {
        Self { argv, poll }
    }
}

impl WorkUnit for ChildProcess {
    fn run(&mut self, progress: &ProgressSignal<'_>) -> anyhow::Result<()> {
        let (program, rest) = self.argv.split_first().context("no command given")?;
        let mut child = Command::new(program)
            .args(rest)
            .spawn()
            .with_context(|| format!("failed to start '{}'", program))?;

        loop {
            let polled = match child.try_wait() {
                Ok(polled) => polled,
                Err(e) => {
                    stop_child(&mut child);
                    return Err(e).with_context(|| format!("failed to poll '{}'", program));
                }
            };
            if let Some(status) = polled {
                if status.success() {
                    return Ok(());
                }
                bail!("'{}' exited with {}", program, status);
            }

            if let Err(e) = progress.signal() {
                stop_child(&mut child);
                return Err(e).with_context(|| format!("stopped '{}'", program));
            }

            thread::sleep(self.poll);
        }
    }
}

/// Kill the child and reap it so it cannot outlive the lease.
fn stop_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), "failed to kill child process: {}", e);
    }
    let _ = child.wait();
}
