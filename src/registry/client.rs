//! The registry client facade.

use std::sync::Arc;

use crate::auth::TokenCache;
use crate::clients::{
    ClassifiedError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse, Transport,
    TransportChain,
};
use crate::config::{LogHook, RegistryConfig, RegistryUrl};
use crate::registry::RegistryError;

/// Client for one registry's HTTP API.
///
/// Owns the composed transport chain, the base URL, and the logging hook.
/// Every operation builds a request, reports it to the hook, and sends it
/// through the chain.
///
/// # Thread Safety
///
/// `RegistryClient` is `Clone`, `Send`, and `Sync`. Clones share the token
/// cache.
///
/// # Example
///
/// ```rust,ignore
/// use registry_client::{Credentials, RegistryClient, RegistryConfig, RegistryUrl};
///
/// let config = RegistryConfig::builder()
///     .url(RegistryUrl::new("https://registry-1.docker.io")?)
///     .credentials(Credentials::new("alice", "s3cret"))
///     .build()?;
///
/// let client = RegistryClient::connect(&config).await?;
/// let tags = client.tags("library/nginx").await?;
/// ```
#[derive(Clone, Debug)]
pub struct RegistryClient {
    url: RegistryUrl,
    chain: TransportChain,
    log_hook: LogHook,
}

// Verify RegistryClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RegistryClient>();
};

impl RegistryClient {
    /// Creates a client without contacting the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let chain = TransportChain::from_config(config)?;
        Ok(Self::from_chain(config, chain))
    }

    /// Creates a client whose chain runs over a custom network transport.
    #[must_use]
    pub fn with_transport(config: &RegistryConfig, network: Arc<dyn Transport>) -> Self {
        let cache = config.token_cache().then(|| Arc::new(TokenCache::new()));
        let chain = TransportChain::new(
            network,
            config.credentials().cloned(),
            config.challenge_order(),
            cache,
        );
        Self::from_chain(config, chain)
    }

    fn from_chain(config: &RegistryConfig, chain: TransportChain) -> Self {
        Self {
            url: config.url().clone(),
            chain,
            log_hook: config.log_hook().clone(),
        }
    }

    /// Creates a client and checks that the registry answers.
    ///
    /// # Errors
    ///
    /// Returns the configuration error, or the error from [`ping`](Self::ping).
    pub async fn connect(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = Self::new(config)?;
        client.ping().await?;
        Ok(client)
    }

    /// Checks the `/v2/` endpoint, authenticating if challenged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the registry is unreachable or
    /// rejects the credentials.
    pub async fn ping(&self) -> Result<(), RegistryError> {
        let url = self.endpoint("/v2/");
        let request = HttpRequest::builder(HttpMethod::Get, url.as_str()).build()?;
        self.send("registry.ping", &request, &[]).await?;
        Ok(())
    }

    /// Returns the registry base URL.
    #[must_use]
    pub const fn url(&self) -> &RegistryUrl {
        &self.url
    }

    /// Returns the transport chain, for requests the client has no method for.
    #[must_use]
    pub const fn transport(&self) -> &TransportChain {
        &self.chain
    }

    pub(crate) const fn log_hook(&self) -> &LogHook {
        &self.log_hook
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        self.url.join(path)
    }

    /// Starts a request for `/v2/<repository>/<kind>/<reference>`.
    pub(crate) fn repository_request(
        &self,
        method: HttpMethod,
        repository: &str,
        kind: &str,
        reference: &str,
    ) -> Result<(String, HttpRequestBuilder), RegistryError> {
        validate_repository(repository)?;
        validate_reference(reference)?;
        let url = self.endpoint(&format!("/v2/{repository}/{kind}/{reference}"));
        let builder = HttpRequest::builder(method, url.as_str());
        Ok((url, builder))
    }

    pub(crate) async fn send(
        &self,
        operation: &str,
        request: &HttpRequest,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, ClassifiedError> {
        self.log_hook.call(operation, &request.url, fields);
        self.chain.execute(request).await
    }
}

/// Checks a repository name such as `library/nginx`.
pub(crate) fn validate_repository(name: &str) -> Result<(), RegistryError> {
    let valid = !name.is_empty()
        && name.split('/').all(|component| {
            let edge = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
            component.starts_with(edge)
                && component.ends_with(edge)
                && component.chars().all(|c| edge(c) || "._-".contains(c))
        });
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidRepository {
            name: name.to_string(),
        })
    }
}

/// Checks a tag or digest.
pub(crate) fn validate_reference(reference: &str) -> Result<(), RegistryError> {
    let valid = !reference.is_empty()
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-:+".contains(c));
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidReference {
            reference: reference.to_string(),
        })
    }
}
