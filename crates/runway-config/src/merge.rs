//! Deep merge of TOML values with per-field source tracking.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never overrides the base layer.

use std::collections::HashMap;
use std::fmt;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/runway/config.toml`).
    System,
    /// User-level configuration (`~/.runway/config.toml`).
    User,
    /// File passed explicitly with `--config`.
    Explicit,
    /// Environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Explicit => write!(f, "--config"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay replace the base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);

                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Walk a value tree and record every leaf path with `layer`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_scalars_and_keeps_siblings() {
        let mut base = parse("[fetch]\nmax_attempts = 3\ntimeout_secs = 60\n");
        let overlay = parse("[fetch]\nmax_attempts = 5\n");
        let mut sources = FieldSources::new();
        record_leaves(&base, "", &ConfigLayer::Defaults, &mut sources);

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

        assert_eq!(base["fetch"]["max_attempts"].as_integer(), Some(5));
        assert_eq!(base["fetch"]["timeout_secs"].as_integer(), Some(60));
        assert_eq!(sources.get("fetch.max_attempts"), Some(&ConfigLayer::User));
        assert_eq!(sources.get("fetch.timeout_secs"), Some(&ConfigLayer::Defaults));
    }

    #[test]
    fn test_new_tables_are_recorded() {
        let mut base = parse("[cache]\nnaming = \"hashed\"\n");
        let overlay = parse("[tools.organizer.source]\nurl = \"https://example.com/o\"\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::Explicit, &mut sources);

        assert_eq!(
            base["tools"]["organizer"]["source"]["url"].as_str(),
            Some("https://example.com/o")
        );
        assert_eq!(
            sources.get("tools.organizer.source.url"),
            Some(&ConfigLayer::Explicit)
        );
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[cache]\nbase_dirs = [\"/a\", \"/b\"]\n");
        let overlay = parse("[cache]\nbase_dirs = [\"/c\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::System, &mut sources);

        let dirs = base["cache"]["base_dirs"].as_array().unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].as_str(), Some("/c"));
    }
}
