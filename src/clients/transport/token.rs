//! Bearer challenge handling and the token exchange.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{Challenge, Credentials, Token, TokenCache, TokenResponse, TokenScope};
use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;

/// Answers a `Bearer` challenge with a token from the challenge's realm.
///
/// On a 401 carrying `Bearer realm=..,service=..,scope=..` the layer fetches
/// a token (from the cache when one is valid, otherwise with a GET to the
/// realm) and replays the original request once with
/// `Authorization: Bearer <token>`. The replayed response is handed back
/// whatever its status.
///
/// With a cache, an endpoint that was challenged before is sent its cached
/// token up front. If the registry rejects that token it is invalidated and
/// the challenge is answered as usual.
///
/// A failed exchange is an [`ErrorKind::Authentication`] error and the
/// original request is not sent again.
///
/// [`ErrorKind::Authentication`]: crate::clients::ErrorKind::Authentication
#[derive(Debug)]
pub struct TokenTransport {
    inner: Arc<dyn Transport>,
    credentials: Option<Credentials>,
    cache: Option<Arc<TokenCache>>,
    defer_to_basic: bool,
}

impl TokenTransport {
    /// Wraps `inner`. Token exchanges are sent through `inner` as well.
    #[must_use]
    pub fn new(
        inner: Arc<dyn Transport>,
        credentials: Option<Credentials>,
        cache: Option<Arc<TokenCache>>,
    ) -> Self {
        Self {
            inner,
            credentials,
            cache,
            defer_to_basic: false,
        }
    }

    /// Leaves 401s that also carry a `Basic` challenge to an outer Basic
    /// layer, as long as the request has not been authorized yet.
    #[must_use]
    pub const fn defer_to_basic(mut self, defer: bool) -> Self {
        self.defer_to_basic = defer;
        self
    }

    /// Performs the token exchange against `scope.realm`.
    async fn exchange(&self, scope: &TokenScope) -> Result<Token, ClassifiedError> {
        let mut builder = HttpRequest::builder(HttpMethod::Get, scope.realm.as_str())
            .header("accept", "application/json");
        if !scope.service.is_empty() {
            builder = builder.query_param("service", scope.service.as_str());
        }
        if !scope.scope.is_empty() {
            builder = builder.query_param("scope", scope.scope.as_str());
        }
        if let Some(credentials) = &self.credentials {
            builder = builder.header("authorization", credentials.basic_authorization());
        }
        let request = builder.build().map_err(|e| {
            ClassifiedError::authentication(format!("invalid token realm '{}'", scope.realm))
                .with_source(e)
        })?;

        tracing::debug!(realm = %scope.realm, service = %scope.service, scope = %scope.scope, "exchanging token");
        let response = self.inner.round_trip(&request).await?;

        if !response.is_ok() {
            tracing::warn!(realm = %scope.realm, code = response.code, "token exchange failed");
            return Err(ClassifiedError::authentication(format!(
                "token exchange with {} failed: HTTP {}",
                scope.realm, response.code
            ))
            .with_response(response));
        }

        let body: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            ClassifiedError::authentication(format!("malformed token response from {}", scope.realm))
                .with_status(response.code)
                .with_source(e)
        })?;

        body.into_token().ok_or_else(|| {
            ClassifiedError::authentication(format!(
                "token response from {} carried no token",
                scope.realm
            ))
            .with_status(response.code)
        })
    }

    /// Picks a cached token for an endpoint that was challenged before.
    fn preauthorize(&self, request: &HttpRequest) -> Option<(TokenScope, Token)> {
        if request.answered.bearer || request.header("authorization").is_some() {
            return None;
        }
        self.cache.as_ref()?.token_for_endpoint(&endpoint_key(request))
    }
}

#[async_trait]
impl Transport for TokenTransport {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        let preauthorized = self.preauthorize(request);
        let response = match &preauthorized {
            Some((_, token)) => {
                let attempt = request.with_header("authorization", token.bearer_authorization());
                self.inner.round_trip(&attempt).await?
            }
            None => self.inner.round_trip(request).await?,
        };
        if response.code != 401 {
            return Ok(response);
        }

        let challenges = response.challenges();
        let Some(Challenge::Bearer {
            realm,
            service,
            scope,
        }) = challenges.iter().find(|c| c.is_bearer())
        else {
            return Ok(response);
        };

        let answered = request.answered.union(response.answered);
        let authorization = request.header("authorization");
        if self.defer_to_basic
            && authorization.is_none()
            && challenges.iter().any(Challenge::is_basic)
        {
            return Ok(response);
        }
        if answered.bearer || authorization.is_some_and(|value| value.starts_with("Bearer ")) {
            // A token was already rejected for this request.
            return Ok(response);
        }

        let Some(realm) = realm else {
            return Err(
                ClassifiedError::authentication("bearer challenge without a realm")
                    .with_response(response),
            );
        };
        let key = TokenScope::new(realm.as_str(), service.as_deref(), scope.as_deref());
        let answered = answered.with_bearer();

        if let Some(cache) = &self.cache {
            if let Some((used, token)) = &preauthorized {
                if *used == key {
                    tracing::debug!(realm = %key.realm, scope = %key.scope, "invalidating rejected token");
                    cache.invalidate(used, token);
                }
            }
            cache.remember_scope(endpoint_key(request), key.clone());

            if let Some(token) = cache.get(&key) {
                tracing::debug!(realm = %key.realm, scope = %key.scope, "using cached token");
                let retry = request.retry_with(token.bearer_authorization(), answered);
                let mut retried = self.inner.round_trip(&retry).await?;
                if retried.code == 401 {
                    tracing::debug!(realm = %key.realm, scope = %key.scope, "invalidating rejected token");
                    cache.invalidate(&key, &token);
                }
                retried.answered = retried.answered.union(answered);
                return Ok(retried);
            }
        }

        let token = self.exchange(&key).await?;
        let authorization = token.bearer_authorization();
        if let Some(cache) = &self.cache {
            cache.insert(key, token);
        }

        let mut retried = self
            .inner
            .round_trip(&request.retry_with(authorization, answered))
            .await?;
        retried.answered = retried.answered.union(answered);
        Ok(retried)
    }
}

/// Cache key for the scope an endpoint is challenged for.
fn endpoint_key(request: &HttpRequest) -> String {
    let url = request.url.split('?').next().unwrap_or_default();
    format!("{} {url}", request.method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::transport::testing::{get, response, ScriptedTransport};
    use crate::clients::ErrorKind;

    const URL: &str = "https://registry.example.com/v2/app/manifests/latest";
    const BEARER: &str =
        r#"Bearer realm="https://auth.example.com/token",service="registry",scope="repository:app:pull,push""#;

    fn layer(network: &Arc<ScriptedTransport>, cache: Option<Arc<TokenCache>>) -> TokenTransport {
        TokenTransport::new(
            network.clone(),
            Some(Credentials::new("alice", "secret")),
            cache,
        )
    }

    fn challenge() -> HttpResponse {
        response(401, &[("WWW-Authenticate", BEARER)], "")
    }

    #[tokio::test]
    async fn test_exchange_request_shape() {
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(200, &[], r#"{"access_token":"abc"}"#)),
            Ok(response(200, &[], "{}")),
        ]);

        let res = layer(&network, None).round_trip(&get(URL)).await.unwrap();

        assert_eq!(res.code, 200);
        let requests = network.requests();
        let exchange = &requests[1];
        assert_eq!(exchange.url, "https://auth.example.com/token");
        assert_eq!(
            exchange.query,
            vec![
                ("service".to_string(), "registry".to_string()),
                ("scope".to_string(), "repository:app:pull,push".to_string()),
            ]
        );
        assert_eq!(
            exchange.header("authorization"),
            Some("Basic YWxpY2U6c2VjcmV0")
        );
        assert_eq!(requests[2].header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_exchange_omits_empty_parameters() {
        let network = ScriptedTransport::new(vec![
            Ok(response(
                401,
                &[("WWW-Authenticate", r#"Bearer realm="https://auth.example.com/token""#)],
                "",
            )),
            Ok(response(200, &[], r#"{"token":"abc"}"#)),
            Ok(response(200, &[], "{}")),
        ]);
        let layer = TokenTransport::new(network.clone(), None, None);

        layer.round_trip(&get(URL)).await.unwrap();

        let exchange = &network.requests()[1];
        assert!(exchange.query.is_empty());
        assert!(exchange.header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_failed_exchange_is_authentication_error() {
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(403, &[], "denied")),
        ]);

        let error = layer(&network, None)
            .round_trip(&get(URL))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Authentication);
        assert_eq!(error.status, Some(403));
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_token_response_is_authentication_error() {
        for body in ["<html>", r#"{"expires_in":60}"#] {
            let network = ScriptedTransport::new(vec![
                Ok(challenge()),
                Ok(response(200, &[], body)),
            ]);

            let error = layer(&network, None)
                .round_trip(&get(URL))
                .await
                .unwrap_err();

            assert_eq!(error.kind, ErrorKind::Authentication);
            assert_eq!(network.calls(), 2);
        }
    }

    #[tokio::test]
    async fn test_challenge_without_realm_is_authentication_error() {
        let network = ScriptedTransport::new(vec![Ok(response(
            401,
            &[("WWW-Authenticate", r#"Bearer service="registry""#)],
            "",
        ))]);

        let error = layer(&network, None)
            .round_trip(&get(URL))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Authentication);
        assert_eq!(error.status, Some(401));
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_challenge_is_returned_not_retried() {
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(200, &[], r#"{"token":"abc"}"#)),
            Ok(challenge()),
        ]);

        let res = layer(&network, None).round_trip(&get(URL)).await.unwrap();

        assert_eq!(res.code, 401);
        assert_eq!(network.calls(), 3);
    }

    #[tokio::test]
    async fn test_known_endpoint_sends_cached_token_up_front() {
        let cache = Arc::new(TokenCache::new());
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(200, &[], r#"{"token":"abc","expires_in":300}"#)),
            Ok(response(200, &[], "{}")),
            Ok(response(200, &[], "{}")),
        ]);
        let layer = layer(&network, Some(cache.clone()));

        layer.round_trip(&get(URL)).await.unwrap();
        let res = layer.round_trip(&get(URL)).await.unwrap();

        assert_eq!(res.code, 200);
        assert_eq!(network.calls(), 4);
        assert_eq!(network.requests()[3].header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_rejected_up_front_token_is_replaced() {
        let cache = Arc::new(TokenCache::new());
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(200, &[], r#"{"token":"abc","expires_in":300}"#)),
            Ok(response(200, &[], "{}")),
            Ok(challenge()),
            Ok(response(200, &[], r#"{"token":"def","expires_in":300}"#)),
            Ok(response(200, &[], "{}")),
        ]);
        let layer = layer(&network, Some(cache.clone()));

        layer.round_trip(&get(URL)).await.unwrap();
        let res = layer.round_trip(&get(URL)).await.unwrap();

        assert_eq!(res.code, 200);
        let requests = network.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[3].header("authorization"), Some("Bearer abc"));
        assert_eq!(requests[4].url, "https://auth.example.com/token");
        assert_eq!(requests[5].header("authorization"), Some("Bearer def"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_cached_token_is_invalidated() {
        let cache = Arc::new(TokenCache::new());
        let network = ScriptedTransport::new(vec![
            Ok(challenge()),
            Ok(response(200, &[], r#"{"token":"abc","expires_in":300}"#)),
            Ok(response(200, &[], "{}")),
            Ok(challenge()),
            Ok(challenge()),
        ]);
        let layer = layer(&network, Some(cache.clone()));

        layer.round_trip(&get(URL)).await.unwrap();
        assert_eq!(cache.len(), 1);

        let other = "https://registry.example.com/v2/app/manifests/v1";
        let res = layer.round_trip(&get(other)).await.unwrap();

        assert_eq!(res.code, 401);
        assert!(cache.is_empty());
        assert_eq!(network.calls(), 5);
        assert_eq!(network.requests()[4].header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_bearer_is_not_answered_twice_for_one_request() {
        let network = ScriptedTransport::new(vec![Ok(challenge())]);
        let mut request = get(URL).with_header("Authorization", "Basic YWxpY2U6c2VjcmV0");
        request.answered = request.answered.with_bearer();

        let res = layer(&network, None).round_trip(&request).await.unwrap();

        assert_eq!(res.code, 401);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_defers_to_basic_when_both_offered() {
        let network = ScriptedTransport::new(vec![Ok(response(
            401,
            &[("WWW-Authenticate", "Basic"), ("WWW-Authenticate", BEARER)],
            "",
        ))]);
        let layer = layer(&network, None).defer_to_basic(true);

        let res = layer.round_trip(&get(URL)).await.unwrap();

        assert_eq!(res.code, 401);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_exchange_network_failure_stays_network() {
        let network = ScriptedTransport::new(vec![Ok(challenge()), Err(ErrorKind::Network)]);

        let error = layer(&network, None)
            .round_trip(&get(URL))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Network);
    }
}
