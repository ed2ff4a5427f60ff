//! Configuration types for Runway.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal runway crates. Domain types are built from them at the boundary
//! (CLI startup). Every section implements [`Default`] so that a bare
//! `[section]` header in TOML produces a working configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine identity probing.
    pub identity: IdentitySection,
    /// Cache placement, rotation and freshness.
    pub cache: CacheSection,
    /// Remote fetch endpoints and retry policy.
    pub fetch: FetchSection,
    /// Device authorization asset.
    pub authorization: AuthorizationSection,
    /// Runtime dependency provisioning.
    pub provisioner: ProvisionerSection,
    /// Logging level and format.
    pub logging: LoggingSection,
    /// Tool catalog, keyed by tool id.
    pub tools: BTreeMap<String, ToolSection>,
    /// Interface assets, keyed by asset id.
    pub assets: BTreeMap<String, AssetSection>,
}

// ---------------------------------------------------------------------------
// IdentitySection
// ---------------------------------------------------------------------------

/// Machine identity probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Timeout for each identity subprocess.
    pub detect_timeout_secs: u64,
    /// Persist the random fallback identity under the Runway home.
    pub persist_fallback: bool,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            detect_timeout_secs: 5,
            persist_fallback: true,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheSection
// ---------------------------------------------------------------------------

/// Cache placement, rotation and freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Directory naming profile: `"hashed"` or `"labeled"`.
    pub naming: String,
    /// Candidate base directories tried before the platform defaults.
    pub base_dirs: Vec<String>,
    /// Maximum age of a cached tool artifact, in hours.
    pub tool_ttl_hours: u64,
    /// Maximum age of a cached interface asset, in hours.
    pub asset_ttl_hours: u64,
    /// Remove cache directories from other epochs at startup.
    pub prune_on_startup: bool,
    /// Apply hidden/system attributes to the cache directory where supported.
    pub hide: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            naming: "hashed".to_owned(),
            base_dirs: Vec::new(),
            tool_ttl_hours: 168,
            asset_ttl_hours: 168,
            prune_on_startup: true,
            hide: true,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchSection
// ---------------------------------------------------------------------------

/// Remote fetch endpoints and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Access flavour: `"raw"` (public content) or `"api"` (token-capable).
    pub access: String,
    /// Base URL of the raw-content endpoint.
    pub raw_base: String,
    /// Base URL of the contents API.
    pub api_base: String,
    /// User agent sent on every request.
    pub user_agent: String,
    /// Overall timeout for one attempt.
    pub timeout_secs: u64,
    /// Total attempts per fetch.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay_secs: u64,
    /// Largest response body accepted.
    pub max_download_bytes: u64,
    /// Environment variable holding the bearer token for `api` access.
    pub token_env: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            access: "raw".to_owned(),
            raw_base: "https://raw.githubusercontent.com".to_owned(),
            api_base: "https://api.github.com".to_owned(),
            user_agent: concat!("runway/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout_secs: 60,
            max_attempts: 3,
            retry_delay_secs: 2,
            max_download_bytes: 536_870_912,
            token_env: "RUNWAY_FETCH_TOKEN".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorizationSection
// ---------------------------------------------------------------------------

/// Device authorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationSection {
    /// Id of the entry in `[assets]` that carries the allow-list. When unset
    /// the gate runs in open mode.
    pub asset: Option<String>,
}

// ---------------------------------------------------------------------------
// ProvisionerSection
// ---------------------------------------------------------------------------

/// Runtime dependency provisioning through pip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerSection {
    /// Python interpreter used for `-m pip`.
    pub python: String,
    /// Alternate package index passed as `--index-url`.
    pub index_url: Option<String>,
    /// Timeout for the presence check of one package.
    pub check_timeout_secs: u64,
    /// Timeout for installing one package.
    pub install_timeout_secs: u64,
}

impl Default for ProvisionerSection {
    fn default() -> Self {
        Self {
            python: if cfg!(windows) { "python" } else { "python3" }.to_owned(),
            index_url: None,
            check_timeout_secs: 30,
            install_timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Console output: `"stderr"`, `"stdout"` or `"none"`.
    pub target: String,
    /// Per-crate tracing directives (e.g. `["runway_fetch=debug"]`).
    pub directives: Vec<String>,
    /// Also write a daily-rotated log file under the Runway home.
    pub file: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directives: Vec::new(),
            file: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources, tools and assets
// ---------------------------------------------------------------------------

/// Where an artifact is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSection {
    /// A file inside a hosted repository.
    Repo {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Path within the repository.
        path: String,
        /// Branch, tag or commit. Defaults to `HEAD`.
        #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
    },
    /// An absolute URL.
    Url {
        /// The URL.
        url: String,
    },
}

impl SourceSection {
    /// Last path component of the source, used as the default file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        let path = match self {
            Self::Repo { path, .. } => path.as_str(),
            Self::Url { url } => url.split(['?', '#']).next().unwrap_or(url),
        };
        path.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

/// One launchable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSection {
    /// Display name. Defaults to the tool id.
    #[serde(default)]
    pub name: Option<String>,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Icon glyph shown next to the name.
    #[serde(default)]
    pub icon: String,
    /// Where the artifact comes from.
    pub source: SourceSection,
    /// Local file name inside the cache. Defaults to the source file name.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Interpreter that runs the artifact (e.g. `"python"`). When unset the
    /// artifact is executed directly.
    #[serde(default)]
    pub runner: Option<String>,
    /// Extra arguments passed after the artifact.
    #[serde(default)]
    pub args: Vec<String>,
    /// Packages that must be installed before launch.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// One interface asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSection {
    /// Where the asset comes from.
    pub source: SourceSection,
    /// Local file name inside the cache. Defaults to the source file name.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Bundled copy used when no cached copy exists and the fetch fails.
    #[serde(default)]
    pub bundled: Option<String>,
}
