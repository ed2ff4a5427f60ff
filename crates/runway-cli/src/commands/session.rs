//! Interactive session: `runway` without a subcommand.
//!
//! The menu runs on a blocking thread; launches and updates run as
//! background jobs whose progress is followed in the foreground. Leaving the
//! session stops every tool it started.

use anyhow::Result;
use dialoguer::{Select, theme::ColorfulTheme};
use runway_launcher::{Launcher, ToolId, ToolOverview};
use tracing::{info, warn};

use crate::commands::cache::print_report;
use crate::commands::launch::{launch_in_background, print_outcome};
use crate::commands::list::print_tools;
use crate::commands::update::{print_report as print_update, print_update_failure, update_in_background};
use crate::context::CliContext;
use crate::theme::{Theme, print_banner};

/// One menu choice.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MenuEntry {
    Launch(ToolId),
    Status,
    Update,
    Quit,
}

fn menu_entries(tools: &[ToolOverview]) -> Vec<(MenuEntry, String)> {
    let mut entries: Vec<_> = tools
        .iter()
        .map(|t| {
            let icon = if t.spec.icon.is_empty() { "•" } else { t.spec.icon.as_str() };
            let label = if t.state.is_active() {
                format!("{icon} {}  {}", t.spec.name, Theme::tool_state(t.state))
            } else {
                format!("{icon} {}", t.spec.name)
            };
            (MenuEntry::Launch(t.spec.id.clone()), label)
        })
        .collect();
    entries.push((MenuEntry::Status, "Show status".to_owned()));
    entries.push((MenuEntry::Update, "Check for updates".to_owned()));
    entries.push((MenuEntry::Quit, "Quit".to_owned()));
    entries
}

async fn choose(labels: Vec<String>) -> Result<Option<usize>> {
    let choice = tokio::task::spawn_blocking(move || {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a tool")
            .items(&labels)
            .default(0)
            .interact_opt()
    })
    .await??;
    Ok(choice)
}

/// Run the interactive menu until the user quits.
pub(crate) async fn run_session(ctx: &CliContext) -> Result<()> {
    print_banner();
    let started = ctx.start().await?;

    println!("  {}", Theme::kv("Authorization", &Theme::authorization(started.authorization)));
    println!(
        "  {}",
        Theme::kv("Cache", &started.location.path().display().to_string())
    );
    if let Some(pruned) = started.pruned.as_ref().filter(|r| !r.is_empty()) {
        print_report(pruned, "");
    }
    println!();

    let launcher = started.launcher;
    let result = menu_loop(&launcher).await;

    let report = launcher.shutdown();
    info!(stopped = report.stopped.len(), "session ended");
    for tool in &report.stopped {
        println!("{}", Theme::dimmed(&format!("stopped {tool}")));
    }
    for (tool, error) in &report.failures {
        eprintln!("{}", Theme::warning(&format!("could not stop {tool}: {error}")));
    }
    println!("{}", Theme::info("Goodbye."));
    result
}

async fn menu_loop(launcher: &Launcher) -> Result<()> {
    loop {
        let (entries, labels): (Vec<_>, Vec<_>) = menu_entries(&launcher.overview()).into_iter().unzip();
        let Some(index) = choose(labels).await? else {
            return Ok(());
        };
        let Some(entry) = entries.into_iter().nth(index) else {
            warn!(index, "menu selection out of range");
            continue;
        };

        match entry {
            MenuEntry::Launch(tool) => match launch_in_background(launcher, tool.as_str()).await {
                Some(outcome) => print_outcome(&outcome),
                None => println!(
                    "{}",
                    Theme::info(&format!("{tool} continues in the background"))
                ),
            },
            MenuEntry::Status => print_tools(launcher),
            MenuEntry::Update => match update_in_background(launcher).await {
                Some(Ok(report)) => print_update(&report),
                Some(Err(failure)) => print_update_failure(&failure),
                None => println!("{}", Theme::info("update continues in the background")),
            },
            MenuEntry::Quit => return Ok(()),
        }
        println!();
    }
}
