//! Runway CLI - tool launcher.
//!
//! Downloads configured tools into a per-device cache, provisions their
//! runtime packages and starts them as independent processes, after checking
//! this device against the authorization list.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod context;
mod progress;
mod theme;

use commands::{assets, cache, config, doctor, id, launch, list, session, update};
use context::CliContext;

/// Runway - tool launcher
#[derive(Parser)]
#[command(name = "runway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to an additional configuration file
    #[arg(short, long, global = true, env = "RUNWAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured tools with their status
    List,

    /// Download (if needed) and start a tool
    Launch {
        /// Tool id
        tool: String,
    },

    /// Re-download every tool
    Update,

    /// Show this device's identity
    Id,

    /// Manage interface assets
    Assets {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run local health checks
    Doctor,
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Refresh assets whose cached copy is no longer valid
    Sync,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show the cache directory for this device
    Path,
    /// Remove cache directories from earlier weeks
    Prune,
    /// Remove the current cache directory
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only a specific section (e.g. cache, fetch, tools)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
    /// Show config file paths being checked
    Paths,
}

fn setup_logging(cli: &Cli) {
    let home = runway_core::RunwayHome::resolve().ok();
    let unified_cfg = home
        .as_ref()
        .and_then(|h| runway_config::Config::load(h.root(), cli.config.as_deref()).ok())
        .map(|r| r.config);

    // Set up logging from config, with --verbose override.
    let log_config = match (&unified_cfg, &home) {
        (Some(cfg), Some(home)) => {
            let mut lc = config_bridge::to_log_config(cfg, home);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        _ => {
            let level = if cli.verbose { "debug" } else { "warn" };
            runway_telemetry::LogConfig::new(level).with_format(runway_telemetry::LogFormat::Compact)
        },
    };
    if let Err(e) = runway_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A tool started by Runway may itself be a Runway build; it must not
    // start a second session.
    if runway_launcher::launched_by_runway() {
        return Ok(());
    }

    let cli = Cli::parse();
    setup_logging(&cli);

    let explicit = cli.config.as_deref();
    match cli.command {
        Some(Commands::Config { command }) => handle_config(command, explicit),
        Some(Commands::Doctor) => doctor::run_doctor(explicit).await,
        Some(Commands::List) => list::run_list(&CliContext::load(explicit)?).await,
        Some(Commands::Launch { tool }) => launch::run_launch(&CliContext::load(explicit)?, &tool).await,
        Some(Commands::Update) => update::run_update(&CliContext::load(explicit)?).await,
        Some(Commands::Id) => id::run_id(&CliContext::load(explicit)?).await,
        Some(Commands::Assets {
            command: AssetCommands::Sync,
        }) => assets::run_sync(&CliContext::load(explicit)?).await,
        Some(Commands::Cache { command }) => handle_cache(&CliContext::load(explicit)?, command).await,
        None => session::run_session(&CliContext::load(explicit)?).await,
    }
}

async fn handle_cache(ctx: &CliContext, command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Path => cache::show_path(ctx).await,
        CacheCommands::Prune => cache::prune(ctx).await,
        CacheCommands::Clear { yes } => cache::clear(ctx, yes).await,
    }
}

fn handle_config(command: ConfigCommands, explicit: Option<&std::path::Path>) -> Result<()> {
    let home = runway_core::RunwayHome::resolve()?;
    match command {
        ConfigCommands::Show { format, section } => {
            config::show_config(&home, explicit, &format, section.as_deref())
        },
        ConfigCommands::Validate => config::validate_config(&home, explicit),
        ConfigCommands::Paths => config::show_paths(&home, explicit),
    }
}
