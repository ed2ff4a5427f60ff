//! HTTP transport.
//!
//! A [`Transport`] performs exactly one GET and returns the complete body.
//! Retries, timeouts per attempt and committing to disk belong to the
//! [`Fetcher`](crate::Fetcher).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use runway_core::{ProgressSink, format_size};
use tracing::debug;
use url::Url;

use crate::error::{FetchError, FetchResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum body size (512 MB).
pub const DEFAULT_MAX_BYTES: u64 = 536_870_912;

/// A single GET request.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL.
    pub url: Url,
    /// Value for the `Accept` header.
    pub accept: Option<&'static str>,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
}

impl FetchRequest {
    /// Anonymous request for `url`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            accept: None,
            bearer: None,
        }
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url.as_str())
            .field("accept", &self.accept)
            .field("has_bearer", &self.bearer.is_some())
            .finish()
    }
}

/// Performs one request and returns the full body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `request`, reporting body progress to `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for non-success responses,
    /// [`FetchError::Transport`]/[`FetchError::Timeout`] for connection
    /// failures and [`FetchError::TooLarge`] when the body exceeds the limit.
    async fn get(&self, request: &FetchRequest, progress: &dyn ProgressSink) -> FetchResult<Vec<u8>>;
}

/// Options for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// `User-Agent` sent on every request.
    pub user_agent: String,
    /// Overall timeout for one request including the body.
    pub timeout: Duration,
    /// Maximum accepted body size.
    pub max_bytes: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("runway/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ReqwestTransport {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the client cannot be built (for
    /// example when no TLS backend is available).
    pub fn new(options: TransportOptions) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            timeout: options.timeout,
            max_bytes: options.max_bytes,
        })
    }

    fn map_error(&self, url: &Url, e: &reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &FetchRequest, progress: &dyn ProgressSink) -> FetchResult<Vec<u8>> {
        let mut builder = self.client.get(request.url.clone());
        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        debug!(url = %request.url, "sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(&request.url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length()
            && len > self.max_bytes
        {
            return Err(FetchError::TooLarge {
                size: len,
                limit: self.max_bytes,
            });
        }

        download_with_limit(response, self.max_bytes, progress)
            .await
            .map_err(|e| match e {
                BodyError::TooLarge(size) => FetchError::TooLarge {
                    size,
                    limit: self.max_bytes,
                },
                BodyError::Stream(e) => self.map_error(&request.url, &e),
            })
    }
}

enum BodyError {
    TooLarge(u64),
    Stream(reqwest::Error),
}

/// Stream a response body into memory, enforcing `max_size`.
async fn download_with_limit(
    response: reqwest::Response,
    max_size: u64,
    progress: &dyn ProgressSink,
) -> Result<Vec<u8>, BodyError> {
    let total = response.content_length();
    let capacity = usize::try_from(total.unwrap_or(0).min(max_size)).unwrap_or(0);
    let mut bytes = Vec::with_capacity(capacity);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Stream)?;
        bytes.extend_from_slice(&chunk);
        let current_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if current_size > max_size {
            return Err(BodyError::TooLarge(current_size));
        }
        report_chunk(progress, current_size, total);
    }

    Ok(bytes)
}

/// Report body progress, as a percentage when the length is known.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report_chunk(progress: &dyn ProgressSink, done: u64, total: Option<u64>) {
    match total {
        Some(total) if total > 0 => {
            let percent = (done as f64 / total as f64 * 100.0).min(100.0);
            #[allow(clippy::cast_possible_truncation)]
            progress.report(
                percent as f32,
                &format!("{} / {}", format_size(done), format_size(total)),
            );
        },
        _ => progress.report(0.0, &format!("{} received", format_size(done))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use runway_core::FnProgress;

    use super::*;

    #[test]
    fn test_request_debug_redacts_token() {
        let mut req = FetchRequest::new(Url::parse("https://example.com/a").unwrap());
        req.bearer = Some("ghp_verysecret".into());
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("ghp_verysecret"));
        assert!(dbg.contains("has_bearer: true"));
    }

    #[test]
    fn test_report_chunk_with_and_without_length() {
        let seen = Mutex::new(Vec::new());
        let sink = FnProgress(|p: f32, m: &str| seen.lock().unwrap().push((p, m.to_owned())));

        report_chunk(&sink, 512, Some(2048));
        report_chunk(&sink, 1536, None);

        let seen = seen.into_inner().unwrap();
        assert!((seen[0].0 - 25.0).abs() < f32::EPSILON);
        assert_eq!(seen[0].1, "512 B / 2.0 KB");
        assert_eq!(seen[1].1, "1.5 KB received");
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(ReqwestTransport::new(TransportOptions::default()).is_ok());
    }
}
