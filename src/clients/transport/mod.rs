//! The authenticated transport chain.
//!
//! A request travels through a stack of [`Transport`] layers. Each layer
//! owns the next one and may inspect the response, replay the request once
//! with credentials, or turn the outcome into a [`ClassifiedError`]:
//!
//! ```text
//! ErrorTransport -> BasicTransport -> TokenTransport -> HttpTransport
//! ```
//!
//! With [`ChallengeOrder::TokenFirst`] the two authentication layers swap
//! places. The layer closest to the network sees a 401 first; when the
//! server offers both challenges, that layer hands the response up to the
//! preferred one instead of answering it.
//!
//! Each authentication layer retries at most once per logical request, so a
//! request can never loop exchanging tokens. A layer that replays a request
//! carries over the challenges already answered for it, which keeps the
//! bound when an outer layer replays through an inner one.

mod basic;
mod error_mapper;
mod network;
mod token;

pub use basic::BasicTransport;
pub use error_mapper::ErrorTransport;
pub use network::{HttpTransport, CLIENT_VERSION};
pub use token::TokenTransport;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{Credentials, TokenCache};
use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::config::{ChallengeOrder, RegistryConfig};
use crate::error::ConfigError;

/// One layer of the transport chain.
///
/// `round_trip` must not consume the request: retry layers replay it.
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the response.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifiedError`] when the layer could not produce a
    /// response it is willing to hand back.
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        (**self).round_trip(request).await
    }
}

/// The composed chain with a single entry point.
///
/// Every response that comes out of [`TransportChain::execute`] is a 2xx or
/// 3xx; anything else is a [`ClassifiedError`].
///
/// # Example
///
/// ```rust,ignore
/// use registry_client::clients::{HttpMethod, HttpRequest, TransportChain};
///
/// let chain = TransportChain::from_config(&config)?;
/// let request = HttpRequest::builder(HttpMethod::Get, "https://r.example.com/v2/")
///     .build()?;
/// let response = chain.execute(&request).await?;
/// ```
#[derive(Clone, Debug)]
pub struct TransportChain {
    root: Arc<dyn Transport>,
    token_cache: Option<Arc<TokenCache>>,
}

// Verify TransportChain is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TransportChain>();
};

impl TransportChain {
    /// Wraps `network` with the error mapper and both authentication layers.
    #[must_use]
    pub fn new(
        network: Arc<dyn Transport>,
        credentials: Option<Credentials>,
        order: ChallengeOrder,
        token_cache: Option<Arc<TokenCache>>,
    ) -> Self {
        let authenticated: Arc<dyn Transport> = match order {
            ChallengeOrder::BasicFirst => {
                let defer_to_basic = credentials.is_some();
                let token = TokenTransport::new(network, credentials.clone(), token_cache.clone())
                    .defer_to_basic(defer_to_basic);
                Arc::new(BasicTransport::new(Arc::new(token), credentials))
            }
            ChallengeOrder::TokenFirst => {
                let basic =
                    BasicTransport::new(network, credentials.clone()).defer_to_token(true);
                Arc::new(TokenTransport::new(
                    Arc::new(basic),
                    credentials,
                    token_cache.clone(),
                ))
            }
        };

        Self {
            root: Arc::new(ErrorTransport::new(authenticated)),
            token_cache,
        }
    }

    /// Builds the chain over an [`HttpTransport`] configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be
    /// created.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        let network = Arc::new(HttpTransport::new(config)?);
        let cache = config.token_cache().then(|| Arc::new(TokenCache::new()));
        Ok(Self::new(
            network,
            config.credentials().cloned(),
            config.challenge_order(),
            cache,
        ))
    }

    /// Sends a request through every layer.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifiedError`] for network failures, unsatisfied
    /// challenges, and HTTP statuses of 400 and above.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        self.root.round_trip(request).await
    }

    /// Returns the shared token cache, if caching is enabled.
    #[must_use]
    pub fn token_cache(&self) -> Option<&TokenCache> {
        self.token_cache.as_deref()
    }
}

#[async_trait]
impl Transport for TransportChain {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        self.execute(request).await
    }
}
