//! CLI theme and styling.

use colored::Colorize;
use runway_launcher::{AuthorizationMode, ToolState};

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a tool's process state.
    pub(crate) fn tool_state(state: ToolState) -> String {
        match state {
            ToolState::NotRunning => "idle".dimmed().to_string(),
            ToolState::Launching => "launching".yellow().to_string(),
            ToolState::Running { pid, started_at } => {
                let label = match pid {
                    Some(pid) => format!("running (pid {pid})"),
                    None => "running".to_owned(),
                };
                format!("{} {}", label.green(), Self::timestamp(&started_at))
            },
        }
    }

    /// Format the authorization mode.
    pub(crate) fn authorization(mode: AuthorizationMode) -> String {
        match mode {
            AuthorizationMode::NoAsset => "open (no allow-list asset)".yellow().to_string(),
            AuthorizationMode::NotConfigured => "open (allow-list empty)".yellow().to_string(),
            AuthorizationMode::Listed { entries } => {
                format!("authorized ({entries} listed devices)").green().to_string()
            },
        }
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
        dt.format("%Y-%m-%d %H:%M").to_string().dimmed().to_string()
    }
}

/// Print a banner for the CLI.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{}",
        format!(
            r"
  ___ _  _ _ ___ __ ____ _ _  _
 | '_| || | ' \ V  V / _` | || |
 |_|  \_,_|_||_\_/\_/\__,_|\_, |
                           |__/  v{version}
"
        )
        .cyan()
    );
    println!("{}", "Tool launcher".dimmed());
    println!();
}
