//! Error types for the transport pipeline.
//!
//! Every failure that leaves the transport chain is a [`ClassifiedError`]
//! whose [`ErrorKind`] places it in a small taxonomy:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | [`ErrorKind::Network`] | connection, DNS, TLS, timeout, or cancellation failure |
//! | [`ErrorKind::Authentication`] | a 401 that could not be satisfied, or a failed token exchange |
//! | [`ErrorKind::ClientError`] | any other 4xx |
//! | [`ErrorKind::ServerError`] | 5xx |
//! | [`ErrorKind::ProtocolViolation`] | undecodable body, missing header, pagination cycle |
//!
//! A layer either resolves a condition (by retrying) or produces exactly one
//! `ClassifiedError`; outer layers pass it through untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_client::clients::ErrorKind;
//!
//! match client.tags("library/nginx").await {
//!     Ok(tags) => println!("{} tags", tags.len()),
//!     Err(e) if e.kind() == Some(ErrorKind::ClientError) => println!("no such repository"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::clients::http_response::HttpResponse;

/// Longest raw body excerpt copied into an error message.
const MAX_BODY_EXCERPT: usize = 512;

/// The taxonomy of pipeline failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection, DNS, TLS, timeout, or cancellation failure.
    Network,
    /// An authentication challenge could not be satisfied.
    Authentication,
    /// HTTP 4xx other than 401.
    ClientError,
    /// HTTP 5xx.
    ServerError,
    /// Malformed server response.
    ProtocolViolation,
}

impl ErrorKind {
    /// Maps an HTTP status to a kind. Statuses below 400 are not errors.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(Self::Authentication),
            400..=499 => Some(Self::ClientError),
            s if s >= 500 => Some(Self::ServerError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network error",
            Self::Authentication => "authentication failed",
            Self::ClientError => "client error",
            Self::ServerError => "server error",
            Self::ProtocolViolation => "protocol violation",
        };
        f.write_str(name)
    }
}

/// One entry of the registry's JSON error envelope.
///
/// Registries report failures as
/// `{"errors": [{"code": "MANIFEST_UNKNOWN", "message": "...", "detail": ...}]}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApiErrorDetail {
    /// Machine readable code (e.g. `NAME_UNKNOWN`).
    #[serde(default)]
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Free-form detail.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

/// The uniform error emitted by every pipeline layer.
///
/// `kind` and `status` are deterministic for a given failing endpoint; only
/// `source` (and timing-dependent message text for network failures) may vary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    /// Taxonomy bucket.
    pub kind: ErrorKind,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Human readable description.
    pub message: String,
    /// Parsed registry error envelope, empty when the body had none.
    pub errors: Vec<ApiErrorDetail>,
    /// The response that caused the failure, headers and body intact.
    pub response: Option<Box<HttpResponse>>,
    /// Underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClassifiedError {
    /// Creates an error of `kind` with no status, response, or cause.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            errors: Vec::new(),
            response: None,
            source: None,
        }
    }

    /// Shorthand for a [`ErrorKind::ProtocolViolation`].
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolViolation, message)
    }

    /// Shorthand for an [`ErrorKind::Authentication`] failure.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Classifies a transport-level failure as [`ErrorKind::Network`].
    #[must_use]
    pub fn network(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("request timed out: {error}")
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        };
        Self::new(ErrorKind::Network, message).with_source(error)
    }

    /// Classifies an HTTP response.
    ///
    /// Statuses below 400 are returned unchanged as `Ok`. Anything else
    /// becomes an error that keeps the response, headers and body intact, so
    /// callers can still inspect it.
    ///
    /// # Errors
    ///
    /// Returns the classified error for statuses of 400 and above.
    pub fn classify(response: HttpResponse) -> Result<HttpResponse, Self> {
        let Some(kind) = ErrorKind::from_status(response.code) else {
            return Ok(response);
        };
        let errors = serde_json::from_slice::<ApiErrorEnvelope>(&response.body)
            .map(|envelope| envelope.errors)
            .unwrap_or_default();
        let message = Self::describe(&response, &errors);

        Err(Self {
            kind,
            status: Some(response.code),
            message,
            errors,
            response: Some(Box::new(response)),
            source: None,
        })
    }

    /// Sets the HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the response that caused the failure.
    #[must_use]
    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.status = Some(response.code);
        self.response = Some(Box::new(response));
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns `true` if the registry reported `code` in its error envelope.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Builds the message: status line, then envelope entries or a body excerpt.
    fn describe(response: &HttpResponse, errors: &[ApiErrorDetail]) -> String {
        let reason = reqwest::StatusCode::from_u16(response.code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status");
        let mut message = format!("HTTP {} {reason}", response.code);

        if !errors.is_empty() {
            let details: Vec<String> = errors
                .iter()
                .map(|e| match (e.code.is_empty(), e.message.is_empty()) {
                    (false, false) => format!("{}: {}", e.code, e.message),
                    (false, true) => e.code.clone(),
                    _ => e.message.clone(),
                })
                .collect();
            message.push_str(&format!(" ({})", details.join("; ")));
        } else {
            let text = response.text();
            let text = text.trim();
            if !text.is_empty() {
                let excerpt: String = text.chars().take(MAX_BODY_EXCERPT).collect();
                message.push_str(&format!(" ({excerpt})"));
            }
        }

        message
    }
}

/// Error returned when a request template fails validation.
///
/// Raised before the request enters the transport chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A body was provided without a content type.
    #[error("Cannot set a body without also setting a content type.")]
    MissingContentType,

    /// A PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The URL is not absolute.
    #[error("Invalid request URL '{url}'.")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },
}
