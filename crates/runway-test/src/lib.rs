//! Runway Test - Shared test utilities.
//!
//! Mock implementations of the transport, process spawner and package
//! manager seams, plus fixtures and harness helpers. Used from `tests/`
//! directories and the integration test crate.
//!
//! ```rust,ignore
//! use runway_test::{MockResponse, MockTransport};
//!
//! let transport = MockTransport::serving("body")
//!     .with_script([MockResponse::Status(503), MockResponse::Status(503)]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
