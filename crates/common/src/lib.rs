//! Pizza E2E Common Library
//!
//! Fixture payloads, wire types and mock route handlers shared by the
//! browser harness and the standalone mock backend.

pub mod currency;
pub mod error;
pub mod fixtures;
pub mod matcher;
pub mod pattern;
pub mod routes;
pub mod types;

// Re-export commonly used types
pub use error::{MockError, MockResult};
pub use pattern::RoutePattern;
pub use routes::{MockRequest, MockResponse, MockRouter, RouteHandler};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
