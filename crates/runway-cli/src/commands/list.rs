//! `runway list`: the tool catalog with live status and cache freshness.

use anyhow::Result;
use chrono::TimeDelta;
use runway_core::format_size;
use runway_launcher::{Launcher, ToolOverview};

use crate::context::CliContext;
use crate::theme::Theme;

/// Print every configured tool.
pub(crate) async fn run_list(ctx: &CliContext) -> Result<()> {
    let started = ctx.start().await?;
    print_tools(&started.launcher);
    Ok(())
}

/// Print the tool table for `launcher`.
pub(crate) fn print_tools(launcher: &Launcher) {
    let tools = launcher.overview();
    if tools.is_empty() {
        println!("{}", Theme::warning("No tools configured."));
        println!(
            "{}",
            Theme::dimmed("Add [tools.<id>] entries to config.toml; see `runway config paths`.")
        );
        return;
    }

    println!("{}", Theme::header("Tools"));
    println!("{}", Theme::separator());
    for tool in &tools {
        let icon = if tool.spec.icon.is_empty() {
            "•"
        } else {
            tool.spec.icon.as_str()
        };
        println!(
            "{icon} {} {}  {}",
            tool.spec.name,
            Theme::dimmed(&format!("({})", tool.spec.id)),
            Theme::tool_state(tool.state)
        );
        if !tool.spec.description.is_empty() {
            println!("    {}", tool.spec.description);
        }
        println!("    {}", Theme::dimmed(&cache_status(tool)));
    }
}

/// One-line cache summary for a tool.
pub(crate) fn cache_status(tool: &ToolOverview) -> String {
    match (&tool.cached, tool.expires_in) {
        (None, _) => "not downloaded".to_owned(),
        (Some(meta), Some(left)) => format!(
            "cached {}, fresh for {}",
            format_size(meta.size),
            format_remaining(left)
        ),
        (Some(meta), None) => format!("cached {}, expired", format_size(meta.size)),
    }
}

/// Render a remaining lifetime as `3d 4h`, `5h 12m` or `12m`.
pub(crate) fn format_remaining(left: TimeDelta) -> String {
    let minutes = u64::try_from(left.num_minutes()).unwrap_or(0);
    let (days, hours, mins) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}
