//! HTTP Basic challenge handling.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;

/// Answers a `Basic` challenge by replaying the request with credentials.
///
/// The retry happens at most once per logical request, including replays
/// made by an outer layer. A 401 on the retried request is handed back
/// as-is, and so is any 401 without a `Basic` challenge.
#[derive(Debug)]
pub struct BasicTransport {
    inner: Arc<dyn Transport>,
    credentials: Option<Credentials>,
    defer_to_token: bool,
}

impl BasicTransport {
    /// Wraps `inner`. Without credentials the layer is a pass-through.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>, credentials: Option<Credentials>) -> Self {
        Self {
            inner,
            credentials,
            defer_to_token: false,
        }
    }

    /// Leaves 401s that also carry a `Bearer` challenge to an outer token
    /// layer, as long as the request has not been authorized yet.
    #[must_use]
    pub const fn defer_to_token(mut self, defer: bool) -> Self {
        self.defer_to_token = defer;
        self
    }
}

#[async_trait]
impl Transport for BasicTransport {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        let response = self.inner.round_trip(request).await?;
        if response.code != 401 {
            return Ok(response);
        }
        let Some(credentials) = &self.credentials else {
            return Ok(response);
        };

        let challenges = response.challenges();
        if !challenges.iter().any(|c| c.is_basic()) {
            return Ok(response);
        }
        let authorized = request.header("authorization").is_some();
        if self.defer_to_token && !authorized && challenges.iter().any(|c| c.is_bearer()) {
            return Ok(response);
        }

        let answered = request.answered.union(response.answered);
        let authorization = credentials.basic_authorization();
        if answered.basic || request.header("authorization") == Some(authorization.as_str()) {
            // Credentials were already rejected.
            return Ok(response);
        }

        tracing::debug!(url = %request.url, "answering basic challenge");
        let retry = request.retry_with(authorization, answered.with_basic());
        let mut retried = self.inner.round_trip(&retry).await?;
        retried.answered = retried.answered.union(retry.answered);
        Ok(retried)
    }
}
