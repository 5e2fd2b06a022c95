//! The outermost layer: turns HTTP failures into classified errors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;

/// Classifies whatever the inner layers produce.
///
/// Responses with a status of 400 or above become a [`ClassifiedError`] that
/// still carries the response. Errors raised further in are already
/// classified and pass through unchanged.
#[derive(Debug)]
pub struct ErrorTransport {
    inner: Arc<dyn Transport>,
}

impl ErrorTransport {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for ErrorTransport {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        self.inner
            .round_trip(request)
            .await
            .and_then(ClassifiedError::classify)
    }
}
