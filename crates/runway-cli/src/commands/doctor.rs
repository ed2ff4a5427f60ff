//! Doctor command for health checks.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use runway_cache::ArtifactStore;
use runway_core::NoProgress;
use runway_launcher::{AssetSync, DeviceAuthorizationGate};

use crate::config_bridge;
use crate::context::CliContext;
use crate::theme::Theme;

/// Run local health checks.
pub(crate) async fn run_doctor(explicit: Option<&Path>) -> Result<()> {
    println!("{}", "Runway Doctor - System Health Check".cyan().bold());
    println!();

    // Configuration
    print!("  Checking configuration... ");
    let ctx = match CliContext::load(explicit) {
        Ok(ctx) => {
            println!("{}", "OK".green());
            println!("    Home: {}", ctx.home.root().display());
            println!("    Tools: {}", ctx.config().tools.len());
            println!("    Assets: {}", ctx.config().assets.len());
            ctx
        },
        Err(e) => {
            println!("{}", "FAIL".red());
            println!("    {e:#}");
            return Ok(());
        },
    };

    // Identity
    print!("  Checking machine identity... ");
    let identity = ctx.identity().await;
    if identity.source().is_stable() {
        println!("{}", "OK".green());
    } else {
        println!("{}", "WARN".yellow());
    }
    println!("    Source: {}", identity.source());
    println!("    Fingerprint: {}", identity.fingerprint().short());

    // Cache location
    print!("  Checking cache location... ");
    let location = match ctx
        .cache_store()
        .and_then(|store| store.locate_or_create(identity.fingerprint()).map_err(anyhow::Error::from))
    {
        Ok(location) => {
            println!("{}", "OK".green());
            println!("    {}", location.path().display());
            Some(location)
        },
        Err(e) => {
            println!("{}", "FAIL".red());
            println!("    {e:#}");
            None
        },
    };

    // Interpreter
    let needs_python = ctx.config().tools.values().any(|t| !t.packages.is_empty());
    print!("  Checking package interpreter... ");
    let pip = config_bridge::to_package_manager(ctx.config());
    match pip.resolve_python() {
        Ok(path) => println!("{} ({})", "OK".green(), path.display()),
        Err(e) if needs_python => println!("{} - {}", "FAIL".red(), e),
        Err(_) => println!("{} (not needed)", "SKIP".dimmed()),
    }

    // Runners
    let runners: BTreeSet<&str> = ctx
        .config()
        .tools
        .values()
        .filter_map(|t| t.runner.as_deref())
        .collect();
    for runner in runners {
        print!("  Checking runner '{runner}'... ");
        match which::which(runner) {
            Ok(path) => println!("{} ({})", "OK".green(), path.display()),
            Err(_) => println!("{} - not found on PATH", "WARN".yellow()),
        }
    }

    // Authorization
    print!("  Checking device authorization... ");
    let text = match (ctx.config().authorization.asset.as_deref(), &location) {
        (Some(id), Some(location)) => {
            let catalog = config_bridge::to_catalog(ctx.config(), ctx.home.root())?;
            match (catalog.asset(id), config_bridge::to_fetcher(ctx.config())) {
                (Some(asset), Ok(fetcher)) => {
                    let sync = AssetSync::new(
                        fetcher,
                        ArtifactStore::new(location.path()),
                        config_bridge::to_ttl_policy(ctx.config()),
                    );
                    match sync.load_text(asset, &NoProgress).await {
                        Ok(loaded) => loaded.text,
                        Err(e) => {
                            println!("{} - {e}", "FAIL".red());
                            return Ok(());
                        },
                    }
                },
                _ => None,
            }
        },
        _ => None,
    };
    match DeviceAuthorizationGate::from_asset(text.as_deref()).mode_for(identity.raw().expose()) {
        Some(mode) => println!("{}", Theme::authorization(mode)),
        None => {
            println!("{}", "DENIED".red());
            println!("    Device id: {}", identity.raw().expose());
        },
    }

    println!();
    Ok(())
}
