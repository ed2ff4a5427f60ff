//! Source locators and their resolution into request URLs.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{FetchError, FetchResult};

/// Default base for raw file access.
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
/// Default base for API access.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Media type asking the contents API for the raw file body.
pub const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// How repository locators are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Anonymous raw file host.
    #[default]
    Raw,
    /// Contents API, optionally authenticated.
    Api,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Api => f.write_str("api"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "api" => Ok(Self::Api),
            other => Err(FetchError::InvalidLocator(format!(
                "unknown access mode '{other}' (expected 'raw' or 'api')"
            ))),
        }
    }
}

/// Base URLs for both access flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    raw_base: Url,
    api_base: Url,
}

impl Endpoints {
    /// Parse both bases.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocator`] if either base is not an
    /// absolute hierarchical URL.
    pub fn parse(raw_base: &str, api_base: &str) -> FetchResult<Self> {
        Ok(Self {
            raw_base: parse_base(raw_base)?,
            api_base: parse_base(api_base)?,
        })
    }

    /// The public hosting service endpoints.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the defaults are valid URLs.
    pub fn public() -> FetchResult<Self> {
        Self::parse(DEFAULT_RAW_BASE, DEFAULT_API_BASE)
    }

    /// Raw file base.
    #[must_use]
    pub fn raw_base(&self) -> &Url {
        &self.raw_base
    }

    /// API base.
    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }
}

fn parse_base(s: &str) -> FetchResult<Url> {
    let url = Url::parse(s).map_err(|e| FetchError::InvalidLocator(format!("'{s}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidLocator(format!("'{s}' cannot be used as a base URL")));
    }
    Ok(url)
}

/// Where a remote artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// A file inside a hosted repository.
    Repo {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Slash-separated path inside the repository.
        path: String,
        /// Branch, tag or commit. `None` means the default branch.
        git_ref: Option<String>,
    },
    /// An absolute URL.
    Url(Url),
}

impl SourceLocator {
    /// A repository locator on the default branch.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocator`] if a component is empty or the
    /// path contains `.`/`..` segments.
    pub fn repo(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
    ) -> FetchResult<Self> {
        let (owner, repo, path) = (owner.into(), repo.into(), path.into());
        for (label, value) in [("owner", &owner), ("repo", &repo)] {
            if value.is_empty() || value.contains('/') {
                return Err(FetchError::InvalidLocator(format!("invalid {label} '{value}'")));
            }
        }
        if path_segments(&path).next().is_none() {
            return Err(FetchError::InvalidLocator("empty repository path".into()));
        }
        if path_segments(&path).any(|s| s == "." || s == "..") {
            return Err(FetchError::InvalidLocator(format!(
                "path '{path}' must not contain '.' or '..' segments"
            )));
        }
        Ok(Self::Repo {
            owner,
            repo,
            path,
            git_ref: None,
        })
    }

    /// Pin a repository locator to a ref. No effect on URL locators.
    #[must_use]
    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        if let Self::Repo { git_ref, .. } = &mut self {
            *git_ref = Some(reference.into());
        }
        self
    }

    /// An absolute URL locator.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocator`] for anything other than an
    /// absolute `http`/`https` URL.
    pub fn url(s: &str) -> FetchResult<Self> {
        let url = Url::parse(s).map_err(|e| FetchError::InvalidLocator(format!("'{s}': {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url)),
            other => Err(FetchError::InvalidLocator(format!(
                "unsupported scheme '{other}' in '{s}'"
            ))),
        }
    }

    /// Last path component, used as the default local file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Repo { path, .. } => path_segments(path).last(),
            Self::Url(url) => url.path_segments()?.rev().find(|s| !s.is_empty()),
        }
    }

    /// Resolve into a request URL for the given access mode.
    ///
    /// URL locators ignore the access mode.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocator`] if the URL cannot be built.
    pub fn resolve(&self, access: AccessMode, endpoints: &Endpoints) -> FetchResult<Url> {
        let (owner, repo, path, git_ref) = match self {
            Self::Url(url) => return Ok(url.clone()),
            Self::Repo {
                owner,
                repo,
                path,
                git_ref,
            } => (owner, repo, path, git_ref),
        };

        match access {
            AccessMode::Raw => {
                let mut url = endpoints.raw_base.clone();
                extend_path(
                    &mut url,
                    [owner.as_str(), repo.as_str(), git_ref.as_deref().unwrap_or("HEAD")]
                        .into_iter()
                        .chain(path_segments(path)),
                )?;
                Ok(url)
            },
            AccessMode::Api => {
                let mut url = endpoints.api_base.clone();
                extend_path(
                    &mut url,
                    ["repos", owner.as_str(), repo.as_str(), "contents"]
                        .into_iter()
                        .chain(path_segments(path)),
                )?;
                if let Some(r) = git_ref {
                    url.query_pairs_mut().append_pair("ref", r);
                }
                Ok(url)
            },
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repo {
                owner,
                repo,
                path,
                git_ref,
            } => {
                write!(f, "{owner}/{repo}/{path}")?;
                if let Some(r) = git_ref {
                    write!(f, "@{r}")?;
                }
                Ok(())
            },
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

fn path_segments(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn extend_path<'a>(url: &mut Url, segments: impl Iterator<Item = &'a str>) -> FetchResult<()> {
    let base = url.to_string();
    let mut path = url
        .path_segments_mut()
        .map_err(|()| FetchError::InvalidLocator(format!("'{base}' cannot be used as a base URL")))?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    Ok(())
}
