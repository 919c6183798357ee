//! Pizza E2E Test Framework
//!
//! This crate drives the pizza frontend in a real Chrome and replaces its
//! backend with scripted responses:
//! - Spawns (or attaches to) the frontend dev server
//! - Controls Chrome over the DevTools protocol
//! - Answers `/api/` requests from the shared mock routes
//! - Runs the built-in purchase scenario plus declarative YAML specs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_spec(spec: TestSpec) -> TestResult               │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserSession (chromiumoxide)                             │
//! │    ├── Interceptor: Fetch.requestPaused -> MockRouter       │
//! │    └── Locator: css | role+name | placeholder | text | label│
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (Rust builder or YAML)                            │
//! │    └── steps: navigate, click, fill, press, select,         │
//! │              expect_text, expect_visible, wait, screenshot  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod error;
pub mod intercept;
pub mod locator;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod spec;

pub use browser::{BrowserConfig, BrowserSession};
pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use runner::TestRunner;
pub use spec::{TestSpec, TestStep};
