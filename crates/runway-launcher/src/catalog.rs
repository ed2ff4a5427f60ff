//! The tool and asset catalog.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use runway_fetch::SourceLocator;
use serde::{Deserialize, Serialize};

/// Identifier of a configured tool (`[A-Za-z0-9_-]+`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    /// Validate and wrap an id.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        is_valid_id(s).then(|| Self(s.to_owned()))
    }

    /// The id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ToolId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `s` is a usable tool or asset id.
#[must_use]
pub fn is_valid_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// A launchable tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Stable id.
    pub id: ToolId,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Icon shown next to the name.
    pub icon: String,
    /// Where the artifact is fetched from.
    pub source: SourceLocator,
    /// Local file name inside the cache.
    pub file_name: String,
    /// Program used to run the artifact (e.g. `python`). `None` runs the
    /// artifact directly.
    pub runner: Option<String>,
    /// Extra arguments after the artifact.
    pub args: Vec<String>,
    /// Runtime packages required before launch.
    pub packages: Vec<String>,
}

impl ToolSpec {
    /// Minimal spec; display name defaults to the id.
    #[must_use]
    pub fn new(id: ToolId, source: SourceLocator, file_name: impl Into<String>) -> Self {
        Self {
            name: id.to_string(),
            id,
            description: String::new(),
            icon: String::new(),
            source,
            file_name: file_name.into(),
            runner: None,
            args: Vec::new(),
            packages: Vec::new(),
        }
    }

    /// Run the artifact through `runner`.
    #[must_use]
    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    /// Require runtime packages.
    #[must_use]
    pub fn with_packages(mut self, packages: Vec<String>) -> Self {
        self.packages = packages;
        self
    }
}

/// A downloadable interface asset.
#[derive(Debug, Clone)]
pub struct AssetSpec {
    /// Stable id.
    pub id: String,
    /// Where the asset is fetched from.
    pub source: SourceLocator,
    /// Local file name inside the cache.
    pub file_name: String,
    /// Local copy shipped with the installation, used when fetching fails.
    pub bundled: Option<PathBuf>,
}

/// Every configured tool and asset.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: BTreeMap<ToolId, ToolSpec>,
    assets: BTreeMap<String, AssetSpec>,
}

impl Catalog {
    /// Build a catalog. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(tools: Vec<ToolSpec>, assets: Vec<AssetSpec>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.id.clone(), t)).collect(),
            assets: assets.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    /// Look up a tool.
    #[must_use]
    pub fn tool(&self, id: &str) -> Option<&ToolSpec> {
        self.tools.get(id)
    }

    /// All tools in id order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// Look up an asset.
    #[must_use]
    pub fn asset(&self, id: &str) -> Option<&AssetSpec> {
        self.assets.get(id)
    }

    /// All assets in id order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetSpec> {
        self.assets.values()
    }

    /// Number of tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}
