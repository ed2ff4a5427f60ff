//! `runway launch <tool>`.

use anyhow::{Result, bail};
use runway_launcher::{LaunchError, LaunchOutcome, Launcher};

use crate::context::CliContext;
use crate::progress::{follow, spawn_job};
use crate::theme::Theme;

/// Launch one tool and wait for it to start.
pub(crate) async fn run_launch(ctx: &CliContext, tool: &str) -> Result<()> {
    let started = ctx.start().await?;
    let Some(outcome) = launch_in_background(&started.launcher, tool).await else {
        bail!("launch of '{tool}' abandoned");
    };
    print_outcome(&outcome);
    if let LaunchOutcome::Failed { tool, .. } = outcome {
        bail!("'{tool}' did not start");
    }
    Ok(())
}

/// Run a launch on a background task and follow its progress.
///
/// Returns `None` if the user abandoned the wait.
pub(crate) async fn launch_in_background(launcher: &Launcher, tool: &str) -> Option<LaunchOutcome> {
    let launcher = launcher.clone();
    let id = tool.to_owned();
    let rx = spawn_job(move |progress| async move { launcher.launch(&id, &progress).await });
    follow(tool, rx).await
}

/// Print a launch outcome.
pub(crate) fn print_outcome(outcome: &LaunchOutcome) {
    match outcome {
        LaunchOutcome::Launched {
            tool,
            pid,
            downloaded,
        } => {
            let how = if *downloaded { "downloaded and started" } else { "started" };
            let pid = pid.map(|p| format!(" (pid {p})")).unwrap_or_default();
            println!("{}", Theme::success(&format!("{tool} {how}{pid}")));
        },
        LaunchOutcome::AlreadyRunning(tool) => {
            println!("{}", Theme::info(&format!("{tool} is already running")));
        },
        LaunchOutcome::Failed { tool, error } => print_failure(tool, error),
    }
}

/// Print a launch error with remediation hints.
pub(crate) fn print_failure(tool: &str, error: &LaunchError) {
    eprintln!("{}", Theme::error(&format!("{tool}: {error}")));
    for hint in error.remediation() {
        eprintln!("  {}", Theme::dimmed(&format!("- {hint}")));
    }
}
