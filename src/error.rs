//! Error types for the OVH dedicated-server driver.

use thiserror::Error;

/// Errors that can occur during driver operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was obtained.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The clock-delta measurement against the API failed. The failure is
    /// cached for the lifetime of the transport instance, so every signed
    /// call on it fails with this error until a fresh instance is built.
    #[error("clock sync with API failed: {0}")]
    ClockSync(String),

    /// API returned an error response.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// API response did not have the expected shape.
    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    /// No matching resource after an exhaustive scan.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation timed out.
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// A required configuration field or node parameter is absent.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A caller-supplied parameter is invalid.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Request body serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
