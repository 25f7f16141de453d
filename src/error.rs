//! Typed error hierarchy for the balena-cloud crate.
//!
//! Every failure a caller can observe is one variant of
//! [`BalenaCloudError`]. Errors originate in exactly two places:
//! - the request executor in [`crate::client`] (transport, status,
//!   content type and decoding failures), and
//! - an accessor's own pre-flight validation (missing identifiers, empty
//!   result sets for single-entity lookups).
//!
//! Nothing in the crate catches or retries an error; each one propagates
//! straight to the caller.

use reqwest::StatusCode;

/// Unified error type for all balena-cloud library operations.
#[derive(Debug, thiserror::Error)]
pub enum BalenaCloudError {
    /// The API could not be reached or answered with a non-success status
    /// other than 401.
    ///
    /// This covers:
    /// - request timeouts (the configured per-request limit elapsed),
    /// - DNS, TCP, TLS and other transport failures (`status` is `None`),
    /// - any non-2xx, non-401 HTTP status (`status` and `body` are set).
    #[error("{message}")]
    Connection {
        /// Human-readable description of what went wrong.
        message: String,
        /// The HTTP status, when the server answered at all.
        status: Option<StatusCode>,
        /// Raw response text for status failures. Empty otherwise.
        body: String,
        /// The underlying transport or timeout error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API rejected the bearer token (HTTP 401).
    #[error("{message}")]
    Authentication {
        /// Human-readable description including the response body.
        message: String,
    },

    /// An operation that needs an identifying parameter was called
    /// without one. Raised before any request is sent.
    #[error("invalid parameters: {0}")]
    ParameterValidation(String),

    /// A single-entity lookup succeeded at the HTTP level but the result
    /// set was empty. The API answers 200 with `{"d": []}` instead of 404.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Catch-all for responses the client cannot interpret, most notably a
    /// success status whose `Content-Type` is not JSON.
    #[error("{message} (Content-Type: {content_type:?}, Response: {body:?})")]
    Unexpected {
        /// Human-readable description of the problem.
        message: String,
        /// The `Content-Type` header the server actually sent.
        content_type: String,
        /// The raw response text.
        body: String,
    },

    /// The response was JSON but did not match the expected shape, for
    /// example a record missing a required field.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<std::convert::Infallible> for BalenaCloudError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, BalenaCloudError>;
