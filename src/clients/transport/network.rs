//! The network transport at the bottom of the chain.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;
use crate::config::RegistryConfig;
use crate::error::ConfigError;

/// Library version from Cargo.toml.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sends requests over the network with `reqwest`.
///
/// Every transport-level failure (connection refused, DNS, TLS, timeout, a
/// body that stops mid-read) comes back as an [`ErrorKind::Network`]
/// error. HTTP statuses are not interpreted here.
///
/// [`ErrorKind::Network`]: crate::clients::ErrorKind::Network
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

// Verify HttpTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpTransport>();
};

impl HttpTransport {
    /// Builds a transport from the registry configuration.
    ///
    /// Applies the timeout, TLS verification setting, and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &RegistryConfig) -> Result<Self, ConfigError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}registry-client/{CLIENT_VERSION}");

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(config.insecure());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| ConfigError::HttpClientBuild {
            reason: e.to_string(),
        })?;

        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        let mut req_builder = self
            .client
            .request(request.method.into(), request.url.as_str());

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let res = req_builder.send().await.map_err(ClassifiedError::network)?;

        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body = res.bytes().await.map_err(ClassifiedError::network)?;

        tracing::trace!(method = %request.method, url = %request.url, code, "round trip");

        Ok(HttpResponse::new(code, headers, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ErrorKind, HttpMethod};
    use crate::config::RegistryUrl;

    fn config() -> RegistryConfig {
        RegistryConfig::builder()
            .url(RegistryUrl::new("http://127.0.0.1:1").unwrap())
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = HttpTransport::new(&config()).unwrap();
        let request = HttpRequest::builder(HttpMethod::Get, "http://127.0.0.1:1/v2/")
            .build()
            .unwrap();

        let error = transport.round_trip(&request).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Network);
        assert!(error.status.is_none());
        assert!(std::error::Error::source(&error).is_some());
    }
}
