//! Environment variable fallbacks.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set. Values that come from the embedded
//! defaults still count as unset.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `RUNWAY_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "RUNWAY_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "RUNWAY_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "RUNWAY_FETCH_ACCESS",
        field_path: "fetch.access",
    },
    EnvMapping {
        var_name: "RUNWAY_PACKAGE_INDEX",
        field_path: "provisioner.index_url",
    },
    EnvMapping {
        var_name: "RUNWAY_PYTHON",
        field_path: "provisioner.python",
    },
];

/// Names of every environment variable consulted as a fallback.
pub fn supported_vars() -> impl Iterator<Item = &'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name)
}

/// Apply environment variable fallbacks to fields that were not set by any
/// config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_string_field(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a string field in the TOML tree, creating intermediate tables.
fn set_string_field(root: &mut toml::Value, path: &str, val: &str) {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), toml::Value::String(val.to_owned()));
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_apply_env_fallbacks() {
        let mut merged: toml::Value = toml::from_str("[cache]\nnaming = \"hashed\"").unwrap();
        let mut sources = FieldSources::new();
        let env = make_env(&[("RUNWAY_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "debug");
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_fallback_overrides_defaults_only() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);

        let env = make_env(&[("RUNWAY_LOG_LEVEL", "trace")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 1);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "trace");
    }

    #[test]
    fn test_env_fallback_skips_file_values() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);

        let env = make_env(&[("RUNWAY_LOG_LEVEL", "debug")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "warn");
    }

    #[test]
    fn test_empty_env_value_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[("RUNWAY_PACKAGE_INDEX", "")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 0);
    }

    #[test]
    fn test_nested_field_created() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[("RUNWAY_PACKAGE_INDEX", "https://mirror.example/simple")]);
        apply_env_fallbacks(&mut merged, &mut sources, &env);
        assert_eq!(
            merged["provisioner"]["index_url"].as_str(),
            Some("https://mirror.example/simple")
        );
    }
}
