//! Error type for registry operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_client::{ErrorKind, RegistryError};
//!
//! match client.manifest_digest("library/nginx", "latest").await {
//!     Ok(digest) => println!("{digest}"),
//!     Err(RegistryError::InvalidRepository { name }) => println!("bad name {name}"),
//!     Err(e) if e.kind() == Some(ErrorKind::ClientError) => println!("not found"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use thiserror::Error;

use crate::clients::{ClassifiedError, ErrorKind, InvalidHttpRequestError};
use crate::error::ConfigError;

/// Error type for [`RegistryClient`](crate::RegistryClient) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The repository name cannot be used in a request path.
    #[error("Invalid repository name '{name}'.")]
    InvalidRepository {
        /// The rejected name.
        name: String,
    },

    /// The tag or digest cannot be used in a request path.
    #[error("Invalid reference '{reference}'.")]
    InvalidReference {
        /// The rejected reference.
        reference: String,
    },

    /// The client could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request template failed validation.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// The request failed in the transport chain.
    #[error(transparent)]
    Http(#[from] ClassifiedError),
}

impl RegistryError {
    /// Returns the taxonomy kind for errors that came out of the chain.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Http(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Returns the HTTP status for errors that came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status,
            _ => None,
        }
    }
}
