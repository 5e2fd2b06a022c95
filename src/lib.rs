//! # Registry Client
//!
//! An async client for the Docker/OCI registry HTTP API.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`RegistryConfig`] and [`RegistryConfigBuilder`]
//! - An authenticated transport chain that answers `Basic` and `Bearer`
//!   challenges transparently, retrying each at most once
//! - A shared bearer token cache keyed by realm, service, and scope
//! - A uniform error taxonomy ([`ErrorKind`]) for every failure
//! - Link-header pagination with cycle detection
//! - Manifest, tag, catalog, and blob operations on [`RegistryClient`]
//!
//! ## Quick Start
//!
//! ```rust
//! use registry_client::{Credentials, RegistryConfig, RegistryUrl};
//!
//! let config = RegistryConfig::builder()
//!     .url(RegistryUrl::new("https://registry.example.com").unwrap())
//!     .credentials(Credentials::new("alice", "s3cret"))
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making Requests
//!
//! ```rust,ignore
//! use registry_client::{RegistryClient, MEDIA_TYPE_MANIFEST_V2};
//!
//! let client = RegistryClient::connect(&config).await?;
//!
//! for tag in client.tags("library/nginx").await? {
//!     let digest = client.manifest_digest("library/nginx", &tag).await?;
//!     println!("{tag} {digest}");
//! }
//!
//! let manifest = client
//!     .manifest("library/nginx", "latest", &[MEDIA_TYPE_MANIFEST_V2])
//!     .await?;
//! ```
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use registry_client::{ErrorKind, RegistryError};
//!
//! match client.tags("library/nginx").await {
//!     Ok(tags) => println!("{} tags", tags.len()),
//!     Err(e) if e.kind() == Some(ErrorKind::Authentication) => println!("check credentials"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: the token cache and log hook belong to the client
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: all types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio runtime; dropping a
//!   future cancels its request

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod registry;

// Re-export public types at crate root for convenience
pub use auth::{Challenge, Credentials, TokenCache};
pub use config::{
    ChallengeOrder, Digest, LogHook, RegistryConfig, RegistryConfigBuilder, RegistryUrl,
};
pub use error::ConfigError;

// Re-export transport types
pub use clients::{
    ClassifiedError, ErrorKind, HttpMethod, HttpRequest, HttpResponse, InvalidHttpRequestError,
    Paginator, Transport, TransportChain,
};

// Re-export registry operations
pub use registry::{
    Manifest, RegistryClient, RegistryError, MEDIA_TYPE_MANIFEST_LIST, MEDIA_TYPE_MANIFEST_V1,
    MEDIA_TYPE_MANIFEST_V2, MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_SIGNED_MANIFEST_V1,
};
