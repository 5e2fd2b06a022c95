//! Configuration error types for the registry client.
//!
//! This module contains the error type returned when configuration values or
//! validated newtypes are constructed from bad input.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Errors raised while talking to a registry live in
//! [`crate::clients::ClassifiedError`] instead.
//!
//! # Example
//!
//! ```rust
//! use registry_client::{ConfigError, RegistryUrl};
//!
//! let result = RegistryUrl::new("ftp://registry.example.com");
//! assert!(matches!(result, Err(ConfigError::InvalidRegistryUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Registry URL is invalid.
    #[error("Invalid registry URL '{url}'. Expected an http:// or https:// URL (e.g., 'https://registry-1.docker.io').")]
    InvalidRegistryUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Digest string is invalid.
    #[error("Invalid digest '{digest}'. Expected format: '<algorithm>:<hex>' (e.g., 'sha256:abc...').")]
    InvalidDigest {
        /// The invalid digest that was provided.
        digest: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    HttpClientBuild {
        /// Why construction failed.
        reason: String,
    },
}
