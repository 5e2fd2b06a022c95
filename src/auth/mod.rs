//! Authentication types for the registry client.
//!
//! This module holds the pieces the transport layers need to satisfy a
//! registry's authentication challenge.
//!
//! # Overview
//!
//! - [`Credentials`]: username/password shared by every layer
//! - [`Challenge`]: a parsed `WWW-Authenticate` header (Basic or Bearer)
//! - [`Token`]: a bearer token with its expiry
//! - [`TokenCache`]: tokens shared across requests, keyed by [`TokenScope`]
//!
//! # Example
//!
//! ```rust
//! use registry_client::auth::Challenge;
//!
//! let challenge = Challenge::parse(
//!     r#"Bearer realm="https://auth.example.com/token",service="registry",scope="repository:app:pull""#,
//! )
//! .unwrap();
//! assert!(challenge.is_bearer());
//! ```

mod challenge;
mod credentials;
mod token;

pub use challenge::Challenge;
pub use credentials::Credentials;
pub use token::{Token, TokenCache, TokenResponse, TokenScope, DEFAULT_TOKEN_LIFETIME_SECS};
