//! The retrying fetcher.
//!
//! One fetch is: resolve the locator, create the destination directory, run
//! up to `max_attempts` bounded attempts against the transport, and only
//! after a complete success commit the body with an atomic rename. A failed
//! fetch never touches an existing destination file.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use runway_cache::{ArtifactKind, ArtifactMeta, ArtifactStore};
use runway_core::{ProgressSink, RetryConfig, RetryOutcome, format_size, retry};
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::locator::{AccessMode, Endpoints, RAW_MEDIA_TYPE, SourceLocator};
use crate::secret::{SecretProvider, StaticSecret};
use crate::transport::{DEFAULT_TIMEOUT, FetchRequest, Transport};

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Where the content was written.
    pub destination: PathBuf,
    /// Bytes written.
    pub bytes: u64,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Identifies an artifact being fetched into an [`ArtifactStore`].
#[derive(Debug, Clone, Copy)]
pub struct ArtifactTarget<'a> {
    /// Tool or asset id.
    pub id: &'a str,
    /// Validity class.
    pub kind: ArtifactKind,
    /// Local file name inside the class directory.
    pub file_name: &'a str,
}

/// Retrieves remote files with bounded retries.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretProvider>,
    endpoints: Endpoints,
    access: AccessMode,
    attempt_timeout: Duration,
    retry: RetryConfig,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("endpoints", &self.endpoints)
            .field("access", &self.access)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Fetcher using `transport` against `endpoints`, raw access, no token
    /// and the default download retry policy.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            secrets: Arc::new(StaticSecret::none()),
            endpoints,
            access: AccessMode::Raw,
            attempt_timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::download(),
        }
    }

    /// Set the access mode for repository locators.
    #[must_use]
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Set the token source used for API access.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretProvider>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Set the overall timeout of a single attempt.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Set the default retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Default retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryConfig {
        &self.retry
    }

    /// Access mode for repository locators.
    #[must_use]
    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Build the request for `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocator`] if the URL cannot be built.
    pub fn request_for(&self, locator: &SourceLocator) -> FetchResult<FetchRequest> {
        let url = locator.resolve(self.access, &self.endpoints)?;
        let mut request = FetchRequest::new(url);
        if matches!(locator, SourceLocator::Repo { .. }) && self.access == AccessMode::Api {
            request.accept = Some(RAW_MEDIA_TYPE);
            request.bearer = self.secrets.token();
        }
        Ok(request)
    }

    /// Fetch `locator` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Exhausted`] once every attempt failed with a
    /// retryable error, the non-retryable error itself otherwise, or
    /// [`FetchError::Io`] if the content cannot be committed.
    pub async fn fetch(
        &self,
        locator: &SourceLocator,
        destination: &Path,
        retry_policy: &RetryConfig,
        progress: &dyn ProgressSink,
    ) -> FetchResult<FetchReport> {
        let request = self.request_for(locator)?;
        let parent = parent_dir(destination);
        std::fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;

        debug!(source = %locator, url = %request.url, dest = %destination.display(), "fetching");

        let transport = &self.transport;
        let request = &request;
        let timeout = self.attempt_timeout;
        let max_attempts = retry_policy.max_attempts;

        let outcome = retry(
            retry_policy,
            |attempt| async move {
                let result = match tokio::time::timeout(timeout, transport.get(request, progress)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        url: request.url.to_string(),
                        secs: timeout.as_secs(),
                    }),
                };
                if let Err(e) = &result {
                    warn!(
                        attempt = attempt.saturating_add(1),
                        max_attempts,
                        error = %e,
                        "download attempt failed"
                    );
                }
                result
            },
            FetchError::is_retryable,
        )
        .await;

        let (body, attempts) = match outcome {
            RetryOutcome::Success { value, attempts } => (value, attempts),
            RetryOutcome::Exhausted { error, attempts } => {
                return Err(FetchError::Exhausted {
                    attempts,
                    last: Box::new(error),
                });
            },
            RetryOutcome::Aborted { error, .. } => return Err(error),
        };

        commit(destination, &body)?;
        let bytes = u64::try_from(body.len()).unwrap_or(u64::MAX);
        progress.report(100.0, &format!("Downloaded {}", format_size(bytes)));
        info!(source = %locator, bytes, attempts, "download complete");

        Ok(FetchReport {
            destination: destination.to_path_buf(),
            bytes,
            attempts,
        })
    }

    /// Fetch an artifact into `store` and record its metadata.
    ///
    /// The returned metadata is what the validity policy reads afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`Fetcher::fetch`], plus [`FetchError::Cache`] if the
    /// sidecar cannot be written.
    pub async fn fetch_artifact(
        &self,
        store: &ArtifactStore,
        target: ArtifactTarget<'_>,
        locator: &SourceLocator,
        progress: &dyn ProgressSink,
    ) -> FetchResult<ArtifactMeta> {
        let destination = store.content_path(target.kind, target.id, target.file_name);
        let report = self
            .fetch(locator, &destination, &self.retry, progress)
            .await?;
        let meta = ArtifactMeta {
            id: target.id.to_owned(),
            kind: target.kind,
            path: report.destination,
            fetched_at: Utc::now(),
            size: report.bytes,
            source: locator.to_string(),
        };
        store.record(&meta)?;
        Ok(meta)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `bytes` next to `destination` and rename over it.
fn commit(destination: &Path, bytes: &[u8]) -> FetchResult<()> {
    let parent = parent_dir(destination);
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| FetchError::io(parent, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| FetchError::io(tmp.path(), e))?;
    tmp.persist(destination)
        .map_err(|e| FetchError::io(destination, e.error))?;
    Ok(())
}
