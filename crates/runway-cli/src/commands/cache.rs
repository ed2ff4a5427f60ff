//! `runway cache path|prune|clear`.

use anyhow::Result;
use runway_cache::{CacheEpoch, PruneReport};
use runway_core::format_size;

use crate::context::CliContext;
use crate::theme::Theme;

/// Show the cache location for this device and epoch.
pub(crate) async fn show_path(ctx: &CliContext) -> Result<()> {
    let identity = ctx.identity().await;
    let store = ctx.cache_store()?;
    let location = store.locate_or_create(identity.fingerprint())?;

    println!("{}", location.path().display());
    println!();
    println!("  {}", Theme::kv("Epoch", &location.epoch().to_string()));
    println!(
        "  {}",
        Theme::kv("Record", &store.record_path(identity.fingerprint()).display().to_string())
    );
    println!("  {}", Theme::kv("Candidates", ""));
    for base in store.candidates() {
        let marker = if location.path().starts_with(base) { "*" } else { " " };
        println!("    {marker} {}", base.display());
    }
    Ok(())
}

/// Remove cache directories left by earlier epochs.
pub(crate) async fn prune(ctx: &CliContext) -> Result<()> {
    let identity = ctx.identity().await;
    let report = ctx
        .cache_store()?
        .prune_stale(identity.fingerprint(), CacheEpoch::current());
    print_report(&report, "No stale cache directories found.");
    Ok(())
}

/// Remove the current cache directory after confirmation.
pub(crate) async fn clear(ctx: &CliContext, yes: bool) -> Result<()> {
    if !yes {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Delete every cached tool and asset for this device?")
            .default(false)
            .interact()?;
        if !confirm {
            println!("{}", Theme::info("Aborted."));
            return Ok(());
        }
    }

    let identity = ctx.identity().await;
    let report = ctx
        .cache_store()?
        .clear(identity.fingerprint(), CacheEpoch::current());
    print_report(&report, "Cache is already empty.");
    Ok(())
}

/// Print pruning statistics.
pub(crate) fn print_report(report: &PruneReport, empty: &str) {
    if report.is_empty() {
        println!("{}", Theme::info(empty));
        return;
    }
    for path in &report.removed {
        println!("  {}", Theme::dimmed(&path.display().to_string()));
    }
    if !report.removed.is_empty() {
        println!(
            "{}",
            Theme::success(&format!(
                "Removed {} directories, reclaimed {}",
                report.removed.len(),
                format_size(report.bytes_reclaimed)
            ))
        );
    }
    for failure in &report.failures {
        eprintln!(
            "{}",
            Theme::warning(&format!("{}: {}", failure.path.display(), failure.error))
        );
    }
}
