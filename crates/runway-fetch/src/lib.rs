//! Runway Fetch - retrieval of remote tools and assets.
//!
//! This crate provides:
//! - Source locators (`owner/repo/path@ref` or absolute URLs) and their
//!   resolution against raw or API endpoints
//! - A [`Transport`] seam with a `reqwest` implementation that streams the
//!   body under a size limit
//! - The [`Fetcher`], which retries transient failures a bounded number of
//!   times and commits content atomically
//! - Bearer token lookup through a [`SecretProvider`]

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod fetcher;
pub mod locator;
pub mod secret;
pub mod transport;

pub use error::{FetchError, FetchResult, NETWORK_HINTS};
pub use fetcher::{ArtifactTarget, FetchReport, Fetcher};
pub use locator::{AccessMode, DEFAULT_API_BASE, DEFAULT_RAW_BASE, Endpoints, RAW_MEDIA_TYPE, SourceLocator};
pub use secret::{EnvSecretProvider, SecretProvider, StaticSecret};
pub use transport::{FetchRequest, ReqwestTransport, Transport, TransportOptions};
