//! Pizza Mock Backend
//!
//! Serves the E2E fixtures over real HTTP so the frontend can run against
//! them without the browser harness.

pub mod server;

pub use server::MockServer;
