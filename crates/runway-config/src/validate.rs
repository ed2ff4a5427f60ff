//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field references resolve.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, SourceSection};

/// Upper bound on fetch attempts.
const MAX_FETCH_ATTEMPTS: u32 = 10;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_identity(config)?;
    validate_cache(config)?;
    validate_fetch(config)?;
    validate_provisioner(config)?;
    validate_logging(config)?;
    validate_tools(config)?;
    validate_assets(config)?;
    validate_authorization(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_identity(config: &Config) -> ConfigResult<()> {
    if config.identity.detect_timeout_secs == 0 {
        return Err(invalid(
            "identity.detect_timeout_secs",
            "detection timeout must be at least 1 second",
        ));
    }
    Ok(())
}

fn validate_cache(config: &Config) -> ConfigResult<()> {
    let c = &config.cache;

    if !matches!(c.naming.as_str(), "hashed" | "labeled") {
        return Err(invalid(
            "cache.naming",
            format!(
                "unsupported naming profile '{}'; expected one of: hashed, labeled",
                c.naming
            ),
        ));
    }
    if c.tool_ttl_hours == 0 {
        return Err(invalid("cache.tool_ttl_hours", "TTL must be at least 1 hour"));
    }
    if c.asset_ttl_hours == 0 {
        return Err(invalid("cache.asset_ttl_hours", "TTL must be at least 1 hour"));
    }
    for (i, dir) in c.base_dirs.iter().enumerate() {
        if !std::path::Path::new(dir).is_absolute() {
            return Err(invalid(
                format!("cache.base_dirs[{i}]"),
                format!("'{dir}' is not an absolute path"),
            ));
        }
    }
    Ok(())
}

fn validate_fetch(config: &Config) -> ConfigResult<()> {
    let f = &config.fetch;

    if !matches!(f.access.as_str(), "raw" | "api") {
        return Err(invalid(
            "fetch.access",
            format!("unsupported access '{}'; expected one of: raw, api", f.access),
        ));
    }
    validate_http_url("fetch.raw_base", &f.raw_base)?;
    validate_http_url("fetch.api_base", &f.api_base)?;
    if f.user_agent.trim().is_empty() {
        return Err(invalid("fetch.user_agent", "user agent must not be empty"));
    }
    if f.timeout_secs == 0 {
        return Err(invalid("fetch.timeout_secs", "timeout must be at least 1 second"));
    }
    if f.max_attempts == 0 || f.max_attempts > MAX_FETCH_ATTEMPTS {
        return Err(invalid(
            "fetch.max_attempts",
            format!("max_attempts must be between 1 and {MAX_FETCH_ATTEMPTS}"),
        ));
    }
    if f.max_download_bytes == 0 {
        return Err(invalid("fetch.max_download_bytes", "limit must be positive"));
    }
    Ok(())
}

fn validate_provisioner(config: &Config) -> ConfigResult<()> {
    let p = &config.provisioner;

    if p.python.trim().is_empty() {
        return Err(invalid("provisioner.python", "interpreter must not be empty"));
    }
    if let Some(index) = &p.index_url {
        validate_http_url("provisioner.index_url", index)?;
    }
    if p.check_timeout_secs == 0 || p.install_timeout_secs == 0 {
        return Err(invalid(
            "provisioner",
            "check and install timeouts must be at least 1 second",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    if !matches!(l.target.as_str(), "stderr" | "stdout" | "none") {
        return Err(invalid(
            "logging.target",
            format!(
                "unsupported target '{}'; expected one of: stderr, stdout, none",
                l.target
            ),
        ));
    }
    Ok(())
}

fn validate_tools(config: &Config) -> ConfigResult<()> {
    for (id, tool) in &config.tools {
        let field = format!("tools.{id}");
        validate_id(&field, id)?;
        validate_source(&format!("{field}.source"), &tool.source)?;
        validate_file_name(
            &format!("{field}.file_name"),
            tool.file_name.as_deref().or_else(|| tool.source.file_name()),
        )?;
        if tool.packages.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid(format!("{field}.packages"), "package names must not be empty"));
        }
    }
    Ok(())
}

fn validate_assets(config: &Config) -> ConfigResult<()> {
    for (id, asset) in &config.assets {
        let field = format!("assets.{id}");
        validate_id(&field, id)?;
        validate_source(&format!("{field}.source"), &asset.source)?;
        validate_file_name(
            &format!("{field}.file_name"),
            asset.file_name.as_deref().or_else(|| asset.source.file_name()),
        )?;
    }
    Ok(())
}

fn validate_authorization(config: &Config) -> ConfigResult<()> {
    if let Some(asset) = &config.authorization.asset
        && !config.assets.contains_key(asset)
    {
        return Err(invalid(
            "authorization.asset",
            format!("'{asset}' is not defined in [assets]"),
        ));
    }
    Ok(())
}

fn validate_id(field: &str, id: &str) -> ConfigResult<()> {
    let ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(invalid(
            field,
            "ids may only contain ASCII letters, digits, '_' and '-'",
        ))
    }
}

fn validate_source(field: &str, source: &SourceSection) -> ConfigResult<()> {
    match source {
        SourceSection::Repo {
            owner, repo, path, ..
        } => {
            if owner.trim().is_empty() || repo.trim().is_empty() || path.trim().is_empty() {
                return Err(invalid(field, "owner, repo and path must all be set"));
            }
            Ok(())
        },
        SourceSection::Url { url } => validate_http_url(&format!("{field}.url"), url),
    }
}

fn validate_file_name(field: &str, name: Option<&str>) -> ConfigResult<()> {
    let Some(name) = name else {
        return Err(invalid(field, "no file name given and none derivable from the source"));
    };
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(invalid(field, format!("'{name}' is not a plain file name")));
    }
    Ok(())
}

fn validate_http_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(invalid(field, format!("'{url}' is not an http(s) URL")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetSection, ToolSection};

    fn tool(source: SourceSection) -> ToolSection {
        ToolSection {
            name: None,
            description: String::new(),
            icon: String::new(),
            source,
            file_name: None,
            runner: None,
            args: Vec::new(),
            packages: Vec::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_naming() {
        let mut config = Config::default();
        config.cache.naming = "disguised".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "cache.naming"));
    }

    #[test]
    fn test_rejects_unknown_log_target() {
        let mut config = Config::default();
        config.logging.target = "syslog".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "logging.target"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = Config::default();
        config.fetch.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_relative_base_dir() {
        let mut config = Config::default();
        config.cache.base_dirs = vec!["relative/dir".to_owned()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_tool_id() {
        let mut config = Config::default();
        config.tools.insert(
            "bad id".to_owned(),
            tool(SourceSection::Url {
                url: "https://example.com/t".to_owned(),
            }),
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_non_http_source() {
        let mut config = Config::default();
        config.tools.insert(
            "t".to_owned(),
            tool(SourceSection::Url {
                url: "file:///etc/passwd".to_owned(),
            }),
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_path_in_file_name() {
        let mut config = Config::default();
        let mut t = tool(SourceSection::Url {
            url: "https://example.com/t".to_owned(),
        });
        t.file_name = Some("../escape".to_owned());
        config.tools.insert("t".to_owned(), t);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_authorization_asset_must_exist() {
        let mut config = Config::default();
        config.authorization.asset = Some("allow".to_owned());
        assert!(validate(&config).is_err());

        config.assets.insert(
            "allow".to_owned(),
            AssetSection {
                source: SourceSection::Repo {
                    owner: "acme".to_owned(),
                    repo: "site".to_owned(),
                    path: "config.js".to_owned(),
                    git_ref: None,
                },
                file_name: None,
                bundled: None,
            },
        );
        assert!(validate(&config).is_ok());
    }
}
