//! `runway assets sync`.

use anyhow::{Result, bail};
use runway_launcher::AssetStatus;

use crate::context::CliContext;
use crate::progress::{follow, spawn_job};
use crate::theme::Theme;

/// Refresh every configured interface asset.
pub(crate) async fn run_sync(ctx: &CliContext) -> Result<()> {
    let started = ctx.start().await?;
    let assets: Vec<_> = started.launcher.catalog().assets().cloned().collect();
    if assets.is_empty() {
        println!("{}", Theme::info("No assets configured."));
        return Ok(());
    }

    let sync = started.assets.clone();
    let rx = spawn_job(move |progress| async move { sync.sync_all(&assets, &progress).await });
    let Some(results) = follow("assets", rx).await else {
        bail!("asset sync abandoned");
    };

    let mut unavailable = 0_usize;
    for (id, status) in &results {
        println!("{}", status_line(id, status));
        if !status.is_usable() {
            unavailable = unavailable.saturating_add(1);
        }
    }
    if unavailable > 0 {
        bail!("{unavailable} asset(s) have no usable copy");
    }
    Ok(())
}

fn status_line(id: &str, status: &AssetStatus) -> String {
    match status {
        AssetStatus::Fresh => Theme::success(&format!("{id}: up to date")),
        AssetStatus::Fetched => Theme::success(&format!("{id}: downloaded")),
        AssetStatus::FallbackCached { error } => {
            Theme::warning(&format!("{id}: kept cached copy ({error})"))
        },
        AssetStatus::FallbackBundled { error } => {
            Theme::warning(&format!("{id}: using bundled copy ({error})"))
        },
        AssetStatus::Unavailable { error } => Theme::error(&format!("{id}: unavailable ({error})")),
    }
}
