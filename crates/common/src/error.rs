//! Error types for mock route handling

use thiserror::Error;

/// Result type alias using MockError
pub type MockResult<T> = std::result::Result<T, MockError>;

/// Hard failures raised by mock handlers.
///
/// Any of these aborts the running scenario; they mark a gap or a
/// mismatch between what the frontend sent and what the fixtures expect.
#[derive(Error, Debug)]
pub enum MockError {
    #[error("Unexpected method {method} for {route} (expected {expected})")]
    UnexpectedMethod {
        route: String,
        method: String,
        expected: String,
    },

    #[error("Missing mock implementation for {route}: {method}")]
    Unhandled { route: String, method: String },

    #[error("Request body for {route} is missing property '{property}'")]
    MissingProperty { route: String, property: String },

    #[error("Request body for {route} does not match at {path}: {reason}")]
    BodyMismatch {
        route: String,
        path: String,
        reason: String,
    },

    #[error("Request body for {route} is not valid JSON: {reason}")]
    InvalidBody { route: String, reason: String },

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
