//! `runway config show|validate|paths`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use runway_config::{Config, ResolvedConfig, ShowFormat};
use runway_core::RunwayHome;

use crate::theme::Theme;

fn parse_format(format: &str) -> Result<ShowFormat> {
    match format.to_ascii_lowercase().as_str() {
        "toml" => Ok(ShowFormat::Toml),
        "json" => Ok(ShowFormat::Json),
        other => bail!("unknown output format '{other}' (expected toml or json)"),
    }
}

pub(crate) fn show_config(
    home: &RunwayHome,
    explicit: Option<&Path>,
    format: &str,
    section: Option<&str>,
) -> Result<()> {
    let format = parse_format(format)?;
    let resolved = Config::load(home.root(), explicit)?;
    let rendered = resolved
        .show(format, section)
        .with_context(|| match section {
            Some(s) => format!("cannot render section '{s}'"),
            None => "cannot render configuration".to_owned(),
        })?;
    println!("{rendered}");
    Ok(())
}

/// Load every layer and report the result. An invalid configuration exits
/// with status 1 so scripts can branch on it.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn validate_config(home: &RunwayHome, explicit: Option<&Path>) -> Result<()> {
    let resolved = match Config::load(home.root(), explicit) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{}", Theme::error(&e.to_string()));
            std::process::exit(1);
        },
    };

    println!("{}", Theme::success("Configuration is valid"));
    println!(
        "  {}",
        Theme::dimmed(&format!(
            "{} tools, {} assets",
            resolved.config.tools.len(),
            resolved.config.assets.len()
        ))
    );
    for path in &resolved.loaded_files {
        println!("  {}", Theme::kv("loaded", path));
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn show_paths(home: &RunwayHome, explicit: Option<&Path>) -> Result<()> {
    println!("{}", Theme::header("Configuration layers (lowest to highest)"));
    println!("  {}", Theme::dimmed("built-in defaults"));
    for path in ResolvedConfig::config_paths(home.root(), explicit) {
        let marker = if Path::new(&path).exists() {
            Theme::success(&path)
        } else {
            Theme::dimmed(&format!("  {path} (absent)"))
        };
        println!("  {marker}");
    }

    println!();
    println!("{}", Theme::header("Environment fallbacks"));
    for var in runway_config::env::supported_vars() {
        println!("  {var}");
    }
    Ok(())
}
