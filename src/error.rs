//! Error types for imagegen-dl
//!
//! This module provides error handling for the library, including:
//! - Request validation errors (empty prompt, out-of-range image count)
//! - Remote endpoint errors (transport failures, non-2xx responses)
//! - Configuration errors with context about which setting is invalid

use thiserror::Error;

/// Result type alias for imagegen-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for imagegen-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_key")
        key: Option<String>,
    },

    /// Network/transport error while talking to a remote endpoint
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint returned a non-success HTTP status
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Response body (or a summary of it) for diagnosis
        message: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Prompt was empty or whitespace-only
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// Requested image count is outside the accepted range
    #[error("requested {requested} images, accepted range is {min}..={max}")]
    InvalidImageCount {
        /// The count the caller asked for
        requested: u32,
        /// Minimum accepted count
        min: u32,
        /// Maximum accepted count
        max: u32,
    },

    /// The model replied successfully but the response carried no usable content
    #[error("model response contained no usable content: {0}")]
    MissingContent(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
