//! Implementation of the `semgate locks` commands.

use crate::cli::ClearArgs;
use semgate::config::Settings;
use semgate::error::Result;
use semgate::exit_codes;
use semgate::semaphore::FileSemaphore;

/// Execute `semgate locks list`.
pub fn cmd_locks_list(settings: &Settings) -> Result<i32> {
    let semaphore = FileSemaphore::new(&settings.lock_dir);
    let leases = semaphore.list_leases()?;

    if leases.is_empty() {
        println!("No leases in {}", semaphore.root().display());
        return Ok(exit_codes::SUCCESS);
    }

    println!("Leases in {}:", semaphore.root().display());
    for lease in &leases {
        println!("  {}", lease);
    }

    let expired = leases.iter().filter(|l| l.expired).count();
    if expired > 0 {
        println!();
        println!(
            "{} expired lease(s); run `semgate locks clear --expired` to remove them.",
            expired
        );
    }

    Ok(exit_codes::SUCCESS)
}

/// Execute `semgate locks clear`.
pub fn cmd_locks_clear(args: ClearArgs, settings: &Settings) -> Result<i32> {
    let semaphore = FileSemaphore::new(&settings.lock_dir);

    if args.expired {
        let cleared = semaphore.clear_expired()?;
        for lease in &cleared {
            tracing::info!(lock_key = %lease.key, slot = lease.slot, "cleared expired lease");
        }
        println!("Cleared {} expired lease(s).", cleared.len());
        return Ok(exit_codes::SUCCESS);
    }

    // clap guarantees a key when --expired is absent.
    let key = args.key.unwrap_or_default();
    let cleared = semaphore.clear_lease(&key, args.slot)?;
    if !cleared.expired {
        tracing::warn!(
            lock_key = %cleared.key,
            slot = cleared.slot,
            owner = %cleared.metadata.owner,
            "cleared a live lease; its holder will fail to release it"
        );
    }
    println!("Cleared {}", cleared);

    Ok(exit_codes::SUCCESS)
}
