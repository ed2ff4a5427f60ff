//! `runway update`: refetch every tool.

use anyhow::{Result, bail};
use runway_core::format_size;
use runway_launcher::{Launcher, UpdateFailure, UpdateReport};

use crate::commands::launch::print_failure;
use crate::context::CliContext;
use crate::progress::{follow, spawn_job};
use crate::theme::Theme;

/// Invalidate and re-download every configured tool.
pub(crate) async fn run_update(ctx: &CliContext) -> Result<()> {
    let started = ctx.start().await?;
    match update_in_background(&started.launcher).await {
        Some(Ok(report)) => {
            print_report(&report);
            Ok(())
        },
        Some(Err(failure)) => {
            print_update_failure(&failure);
            bail!("update stopped at '{}'", failure.tool);
        },
        None => bail!("update abandoned"),
    }
}

/// Run an update on a background task and follow its progress.
pub(crate) async fn update_in_background(launcher: &Launcher) -> Option<Result<UpdateReport, UpdateFailure>> {
    let launcher = launcher.clone();
    let rx = spawn_job(move |progress| async move { launcher.update_all(&progress).await });
    follow("update", rx).await
}

/// Print a successful update.
pub(crate) fn print_report(report: &UpdateReport) {
    if report.updated.is_empty() {
        println!("{}", Theme::info("No tools configured; nothing to update."));
        return;
    }
    for (tool, size) in &report.updated {
        println!("{}", Theme::success(&format!("{tool} ({})", format_size(*size))));
    }
    println!(
        "{}",
        Theme::dimmed(&format!(
            "{} tools updated, {} stale entries invalidated",
            report.updated.len(),
            report.invalidated
        ))
    );
}

/// Print a failed update.
pub(crate) fn print_update_failure(failure: &UpdateFailure) {
    for (tool, size) in &failure.updated {
        println!("{}", Theme::success(&format!("{tool} ({})", format_size(*size))));
    }
    print_failure(failure.tool.as_str(), &failure.error);
}
