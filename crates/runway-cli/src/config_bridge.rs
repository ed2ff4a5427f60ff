//! Bridge from `runway_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This module
//! translates its plain sections into the types the cache, fetch and launcher
//! crates operate on, so config-to-domain conversion happens in one place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use runway_cache::{NamingProfile, StoreOptions, TtlPolicy};
use runway_config::{AssetSection, Config, SourceSection, ToolSection};
use runway_core::{IdentityOptions, RetryConfig, RunwayHome};
use runway_fetch::{
    AccessMode, EnvSecretProvider, Endpoints, Fetcher, ReqwestTransport, SourceLocator, TransportOptions,
};
use runway_launcher::{
    AssetSpec, BootstrapOptions, Catalog, DependencyProvisioner, OsSpawner, PipPackageManager, ToolId, ToolSpec,
};
use runway_telemetry::{LogConfig, LogFormat, LogTarget};

/// Convert config to [`LogConfig`].
///
/// Unknown formats fall back to compact output, unknown targets to stderr.
#[must_use]
pub(crate) fn to_log_config(cfg: &Config, home: &RunwayHome) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);
    let target = cfg.logging.target.parse::<LogTarget>().unwrap_or_default();

    let mut log_config = LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_target(target);
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    if cfg.logging.file {
        log_config = log_config.with_file_logging(home.logs_dir());
    }
    log_config
}

/// Convert config to [`IdentityOptions`].
#[must_use]
pub(crate) fn to_identity_options(cfg: &Config, home: &RunwayHome) -> IdentityOptions {
    IdentityOptions {
        detect_timeout: Duration::from_secs(cfg.identity.detect_timeout_secs),
        fallback_path: cfg
            .identity
            .persist_fallback
            .then(|| home.fallback_identity_path()),
    }
}

/// Convert config to [`StoreOptions`].
///
/// # Errors
///
/// Returns an error if the naming profile is unknown.
pub(crate) fn to_store_options(cfg: &Config, home: &RunwayHome) -> Result<StoreOptions> {
    let naming: NamingProfile = cfg.cache.naming.parse()?;
    let configured = cfg.cache.base_dirs.iter().map(PathBuf::from).collect();
    Ok(StoreOptions::new(home.state_dir(), configured)
        .with_naming(naming)
        .with_hide(cfg.cache.hide))
}

/// Convert config to [`TtlPolicy`].
#[must_use]
pub(crate) fn to_ttl_policy(cfg: &Config) -> TtlPolicy {
    TtlPolicy::from_hours(cfg.cache.tool_ttl_hours, cfg.cache.asset_ttl_hours)
}

/// Convert config to [`RetryConfig`].
#[must_use]
pub(crate) fn to_retry_config(cfg: &Config) -> RetryConfig {
    RetryConfig::fixed(
        cfg.fetch.max_attempts,
        Duration::from_secs(cfg.fetch.retry_delay_secs),
    )
}

/// Build a [`Fetcher`] over the real HTTP transport.
///
/// # Errors
///
/// Returns an error if an endpoint or the access mode is invalid, or the
/// HTTP client cannot be built.
pub(crate) fn to_fetcher(cfg: &Config) -> Result<Fetcher> {
    let f = &cfg.fetch;
    let endpoints = Endpoints::parse(&f.raw_base, &f.api_base)?;
    let access: AccessMode = f.access.parse()?;
    let timeout = Duration::from_secs(f.timeout_secs);
    let transport = ReqwestTransport::new(TransportOptions {
        user_agent: f.user_agent.clone(),
        timeout,
        max_bytes: f.max_download_bytes,
    })?;

    Ok(Fetcher::new(Arc::new(transport), endpoints)
        .with_access(access)
        .with_secrets(Arc::new(EnvSecretProvider::new(&f.token_env)))
        .with_attempt_timeout(timeout)
        .with_retry(to_retry_config(cfg)))
}

/// Build the pip-backed [`PipPackageManager`].
#[must_use]
pub(crate) fn to_package_manager(cfg: &Config) -> PipPackageManager {
    let p = &cfg.provisioner;
    PipPackageManager::new(&p.python)
        .with_index_url(p.index_url.clone())
        .with_timeouts(
            Duration::from_secs(p.check_timeout_secs),
            Duration::from_secs(p.install_timeout_secs),
        )
}

/// Convert a source section into a [`SourceLocator`].
///
/// # Errors
///
/// Returns an error if the repository components or URL are invalid.
pub(crate) fn to_locator(source: &SourceSection) -> Result<SourceLocator> {
    let locator = match source {
        SourceSection::Repo {
            owner,
            repo,
            path,
            git_ref,
        } => {
            let locator = SourceLocator::repo(owner, repo, path)?;
            match git_ref {
                Some(r) => locator.with_ref(r),
                None => locator,
            }
        },
        SourceSection::Url { url } => SourceLocator::url(url)?,
    };
    Ok(locator)
}

fn local_file_name(id: &str, explicit: Option<&String>, source: &SourceSection) -> Result<String> {
    explicit
        .map(String::as_str)
        .or_else(|| source.file_name())
        .map(str::to_owned)
        .with_context(|| format!("'{id}' has no file name and its source does not end in one"))
}

fn to_tool_spec(id: &str, section: &ToolSection) -> Result<ToolSpec> {
    let tool_id = ToolId::parse(id).with_context(|| format!("invalid tool id '{id}'"))?;
    let source = to_locator(&section.source).with_context(|| format!("tools.{id}.source"))?;
    let file_name = local_file_name(id, section.file_name.as_ref(), &section.source)?;

    let mut spec = ToolSpec::new(tool_id, source, file_name).with_packages(section.packages.clone());
    if let Some(name) = &section.name {
        spec.name.clone_from(name);
    }
    spec.description.clone_from(&section.description);
    spec.icon.clone_from(&section.icon);
    spec.args.clone_from(&section.args);
    if let Some(runner) = &section.runner {
        spec = spec.with_runner(runner);
    }
    Ok(spec)
}

fn to_asset_spec(id: &str, section: &AssetSection, bundle_root: &Path) -> Result<AssetSpec> {
    Ok(AssetSpec {
        id: id.to_owned(),
        source: to_locator(&section.source).with_context(|| format!("assets.{id}.source"))?,
        file_name: local_file_name(id, section.file_name.as_ref(), &section.source)?,
        bundled: section.bundled.as_deref().map(|p| bundle_root.join(p)),
    })
}

/// Convert the `[tools]` and `[assets]` tables to a [`Catalog`].
///
/// Relative bundled paths resolve against `bundle_root`.
///
/// # Errors
///
/// Returns an error naming the first entry that cannot be converted.
pub(crate) fn to_catalog(cfg: &Config, bundle_root: &Path) -> Result<Catalog> {
    let tools = cfg
        .tools
        .iter()
        .map(|(id, section)| to_tool_spec(id, section))
        .collect::<Result<Vec<_>>>()?;
    let assets = cfg
        .assets
        .iter()
        .map(|(id, section)| to_asset_spec(id, section, bundle_root))
        .collect::<Result<Vec<_>>>()?;
    Ok(Catalog::new(tools, assets))
}

/// Assemble everything the startup sequence needs.
///
/// # Errors
///
/// Returns an error if any section cannot be converted.
pub(crate) fn to_bootstrap_options(cfg: &Config, home: &RunwayHome) -> Result<BootstrapOptions> {
    Ok(BootstrapOptions {
        store: to_store_options(cfg, home)?,
        prune_on_start: cfg.cache.prune_on_startup,
        catalog: to_catalog(cfg, home.root())?,
        policy: to_ttl_policy(cfg),
        fetcher: to_fetcher(cfg)?,
        provisioner: DependencyProvisioner::new(Arc::new(to_package_manager(cfg))),
        spawner: Arc::new(OsSpawner),
        authorization_asset: cfg.authorization.asset.clone(),
    })
}

#[cfg(test)]
mod tests {
    use runway_cache::ArtifactKind;

    use super::*;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_catalog_from_tools_and_assets() {
        let cfg = config(
            r#"
            [tools.merger]
            name = "Subtitle Merger"
            icon = "M"
            runner = "python"
            packages = ["pysrt"]
            source = { owner = "acme", repo = "tools", path = "merge/merge.py", ref = "v2" }

            [tools.organizer]
            source = { url = "https://example.com/dl/organizer" }

            [assets.devices]
            source = { owner = "acme", repo = "web", path = "devices.js" }
            bundled = "bundle/devices.js"
        "#,
        );
        let catalog = to_catalog(&cfg, Path::new("/opt/runway")).unwrap();

        let merger = catalog.tool("merger").unwrap();
        assert_eq!(merger.name, "Subtitle Merger");
        assert_eq!(merger.file_name, "merge.py");
        assert_eq!(merger.runner.as_deref(), Some("python"));
        assert_eq!(merger.packages, vec!["pysrt".to_owned()]);
        assert!(matches!(
            &merger.source,
            SourceLocator::Repo { git_ref: Some(r), .. } if r == "v2"
        ));

        let organizer = catalog.tool("organizer").unwrap();
        assert_eq!(organizer.name, "organizer");
        assert_eq!(organizer.file_name, "organizer");

        let devices = catalog.asset("devices").unwrap();
        assert_eq!(
            devices.bundled.as_deref(),
            Some(Path::new("/opt/runway/bundle/devices.js"))
        );
    }

    #[test]
    fn test_invalid_tool_id_is_rejected() {
        let cfg = config(
            r#"
            [tools."bad id"]
            source = { url = "https://example.com/tool" }
        "#,
        );
        let err = to_catalog(&cfg, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("bad id"));
    }

    #[test]
    fn test_source_without_file_name_needs_explicit_one() {
        let cfg = config(
            r#"
            [tools.site]
            source = { url = "https://example.com/" }
        "#,
        );
        assert!(to_catalog(&cfg, Path::new("/")).is_err());

        let cfg = config(
            r#"
            [tools.site]
            file_name = "site.bin"
            source = { url = "https://example.com/" }
        "#,
        );
        let catalog = to_catalog(&cfg, Path::new("/")).unwrap();
        assert_eq!(catalog.tool("site").unwrap().file_name, "site.bin");
    }

    #[test]
    fn test_store_options_put_configured_dirs_first() {
        let home = RunwayHome::from_path("/home/u/.runway");
        let mut cfg = Config::default();
        cfg.cache.base_dirs = vec!["/data/cache".to_owned()];
        cfg.cache.naming = "labeled".to_owned();
        cfg.cache.hide = false;

        let opts = to_store_options(&cfg, &home).unwrap();
        assert_eq!(opts.base_dirs[0], PathBuf::from("/data/cache"));
        assert_eq!(opts.naming, NamingProfile::Labeled);
        assert_eq!(opts.record_dir, home.state_dir());
        assert!(!opts.hide);
    }

    #[test]
    fn test_unknown_naming_profile_fails() {
        let home = RunwayHome::from_path("/tmp/r");
        let mut cfg = Config::default();
        cfg.cache.naming = "scrambled".to_owned();
        assert!(to_store_options(&cfg, &home).is_err());
    }

    #[test]
    fn test_retry_and_ttl_follow_config() {
        let mut cfg = Config::default();
        cfg.fetch.max_attempts = 5;
        cfg.cache.tool_ttl_hours = 2;

        let retry = to_retry_config(&cfg);
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_secs(2));

        let ttl = to_ttl_policy(&cfg);
        assert_eq!(ttl.ttl(ArtifactKind::Tool), chrono::TimeDelta::hours(2));
    }

    #[test]
    fn test_identity_fallback_path_is_optional() {
        let home = RunwayHome::from_path("/tmp/r");
        let mut cfg = Config::default();
        assert_eq!(
            to_identity_options(&cfg, &home).fallback_path,
            Some(home.fallback_identity_path())
        );
        cfg.identity.persist_fallback = false;
        assert!(to_identity_options(&cfg, &home).fallback_path.is_none());
    }

    #[test]
    fn test_log_config_enables_file_output() {
        let home = RunwayHome::from_path("/tmp/r");
        let mut cfg = Config::default();
        cfg.logging.format = "json".to_owned();
        cfg.logging.file = true;
        cfg.logging.target = "none".to_owned();
        cfg.logging.directives = vec!["runway_fetch=debug".to_owned()];

        let lc = to_log_config(&cfg, &home);
        assert_eq!(lc.format, LogFormat::Json);
        assert_eq!(lc.target, LogTarget::None);
        assert_eq!(lc.directives, vec!["runway_fetch=debug".to_owned()]);
        assert_eq!(lc.file.unwrap().directory, home.logs_dir());
    }

    #[test]
    fn test_demo_config_converts() {
        let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/runway.toml");
        let cfg = Config::load_file(&demo).unwrap();
        let home = RunwayHome::from_path("/home/u/.runway");

        let options = to_bootstrap_options(&cfg, &home).unwrap();
        assert_eq!(options.catalog.tool_count(), 3);
        assert_eq!(options.authorization_asset.as_deref(), Some("devices"));
        let devices = options.catalog.asset("devices").unwrap();
        assert_eq!(
            devices.bundled.as_deref(),
            Some(Path::new("/home/u/.runway/bundle/devices.js"))
        );
        let merger = options.catalog.tool("subtitle_merger").unwrap();
        assert_eq!(merger.file_name, "subtitle_merger.py");
        assert_eq!(merger.packages.len(), 2);
    }

    #[test]
    fn test_fetcher_rejects_unknown_access() {
        let mut cfg = Config::default();
        cfg.fetch.access = "ftp".to_owned();
        assert!(to_fetcher(&cfg).is_err());
    }
}
