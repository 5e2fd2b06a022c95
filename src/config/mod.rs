//! Configuration types for the registry client.
//!
//! This module provides the configuration used to build a
//! [`RegistryClient`](crate::RegistryClient) and its transport chain.
//!
//! # Overview
//!
//! - [`RegistryConfig`]: all settings for one registry
//! - [`RegistryConfigBuilder`]: builder for [`RegistryConfig`]
//! - [`RegistryUrl`]: a validated registry base URL
//! - [`Digest`]: a validated content digest
//! - [`ChallengeOrder`]: which auth layer sees a 401 first
//! - [`LogHook`]: the per-client log callback
//!
//! # Example
//!
//! ```rust
//! use registry_client::{Credentials, RegistryConfig, RegistryUrl};
//! use std::time::Duration;
//!
//! let config = RegistryConfig::builder()
//!     .url(RegistryUrl::new("https://registry.example.com").unwrap())
//!     .credentials(Credentials::new("alice", "s3cret"))
//!     .timeout(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.url().as_ref(), "https://registry.example.com");
//! ```

mod log_hook;
mod newtypes;

pub use log_hook::LogHook;
pub use newtypes::{Digest, RegistryUrl};

use crate::auth::Credentials;
use crate::error::ConfigError;
use std::time::Duration;

/// Order in which the authentication layers see a response.
///
/// When a server offers both a Basic and a Bearer challenge on the same 401,
/// the layer closer to the network answers it first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChallengeOrder {
    /// Try Basic before exchanging a token.
    #[default]
    BasicFirst,
    /// Try a token exchange before Basic.
    TokenFirst,
}

/// Configuration for one registry.
///
/// # Thread Safety
///
/// `RegistryConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    url: RegistryUrl,
    credentials: Option<Credentials>,
    insecure: bool,
    timeout: Option<Duration>,
    user_agent_prefix: Option<String>,
    challenge_order: ChallengeOrder,
    token_cache: bool,
    log_hook: LogHook,
}

impl RegistryConfig {
    /// Creates a new builder for constructing a `RegistryConfig`.
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::new()
    }

    /// Returns the registry base URL.
    #[must_use]
    pub const fn url(&self) -> &RegistryUrl {
        &self.url
    }

    /// Returns the configured credentials, if any.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns whether TLS certificate verification is disabled.
    #[must_use]
    pub const fn insecure(&self) -> bool {
        self.insecure
    }

    /// Returns the per-call timeout, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the challenge order.
    #[must_use]
    pub const fn challenge_order(&self) -> ChallengeOrder {
        self.challenge_order
    }

    /// Returns whether exchanged tokens are cached across requests.
    #[must_use]
    pub const fn token_cache(&self) -> bool {
        self.token_cache
    }

    /// Returns the logging hook.
    #[must_use]
    pub const fn log_hook(&self) -> &LogHook {
        &self.log_hook
    }
}

// Verify RegistryConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RegistryConfig>();
};

/// Builder for constructing [`RegistryConfig`] instances.
///
/// The only required field is `url`.
///
/// # Defaults
///
/// - `credentials`: `None` (anonymous)
/// - `insecure`: `false`
/// - `timeout`: `None` (no per-call timeout)
/// - `user_agent_prefix`: `None`
/// - `challenge_order`: [`ChallengeOrder::BasicFirst`]
/// - `token_cache`: `true`
/// - `log_hook`: [`LogHook::tracing`]
#[derive(Debug, Default)]
pub struct RegistryConfigBuilder {
    url: Option<RegistryUrl>,
    credentials: Option<Credentials>,
    insecure: bool,
    timeout: Option<Duration>,
    user_agent_prefix: Option<String>,
    challenge_order: ChallengeOrder,
    token_cache: Option<bool>,
    log_hook: Option<LogHook>,
}

impl RegistryConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registry base URL (required).
    #[must_use]
    pub fn url(mut self, url: RegistryUrl) -> Self {
        self.url = Some(url);
        self
    }

    /// Sets the credentials used for Basic auth and token exchanges.
    ///
    /// Empty credentials are treated as anonymous access.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = (!credentials.is_empty()).then_some(credentials);
        self
    }

    /// Disables TLS certificate verification.
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Sets a timeout applied to every network call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets which authentication layer answers a 401 first.
    #[must_use]
    pub const fn challenge_order(mut self, order: ChallengeOrder) -> Self {
        self.challenge_order = order;
        self
    }

    /// Enables or disables the shared token cache.
    #[must_use]
    pub const fn token_cache(mut self, enabled: bool) -> Self {
        self.token_cache = Some(enabled);
        self
    }

    /// Sets the logging hook.
    #[must_use]
    pub fn log_hook(mut self, hook: LogHook) -> Self {
        self.log_hook = Some(hook);
        self
    }

    /// Builds the [`RegistryConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `url` is not set.
    pub fn build(self) -> Result<RegistryConfig, ConfigError> {
        let url = self
            .url
            .ok_or(ConfigError::MissingRequiredField { field: "url" })?;

        Ok(RegistryConfig {
            url,
            credentials: self.credentials,
            insecure: self.insecure,
            timeout: self.timeout,
            user_agent_prefix: self.user_agent_prefix,
            challenge_order: self.challenge_order,
            token_cache: self.token_cache.unwrap_or(true),
            log_hook: self.log_hook.unwrap_or_default(),
        })
    }
}
