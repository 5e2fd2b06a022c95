//! HTTP request templates.
//!
//! This module provides the [`HttpRequest`] type and its builder. A request is
//! an immutable template: retry layers replay it by cloning and adding an
//! `Authorization` header, so the body is always held in memory.

use std::collections::HashMap;
use std::fmt;

use crate::clients::errors::InvalidHttpRequestError;

/// HTTP methods used by the registry API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP HEAD method for existence checks and digests.
    Head,
    /// HTTP PUT method for uploading manifests.
    Put,
    /// HTTP DELETE method for removing manifests.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Head => write!(f, "head"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Head => Self::HEAD,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Challenge schemes a logical request has already been retried for.
///
/// Retry layers copy it onto the request they replay and onto the response
/// they hand back, so a layer further along the chain can see what was
/// already tried on this request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct AnsweredChallenges {
    pub(crate) basic: bool,
    pub(crate) bearer: bool,
}

impl AnsweredChallenges {
    pub(crate) const fn union(self, other: Self) -> Self {
        Self {
            basic: self.basic || other.basic,
            bearer: self.bearer || other.bearer,
        }
    }

    pub(crate) const fn with_basic(mut self) -> Self {
        self.basic = true;
        self
    }

    pub(crate) const fn with_bearer(mut self) -> Self {
        self.bearer = true;
        self
    }
}

/// An HTTP request to be sent through the transport chain.
///
/// Header names are stored lowercased.
///
/// # Example
///
/// ```rust
/// use registry_client::clients::{HttpMethod, HttpRequest};
///
/// let request = HttpRequest::builder(HttpMethod::Get, "https://r.example.com/v2/app/tags/list")
///     .header("Accept", "application/json")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.header("accept"), Some("application/json"));
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub method: HttpMethod,
    /// The absolute URL.
    pub url: String,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Request headers, keyed by lowercased name.
    pub headers: HashMap<String, String>,
    /// The buffered request body, if any.
    pub body: Option<Vec<u8>>,
    pub(crate) answered: AnsweredChallenges,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, url: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, url)
    }

    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns a copy of this request with `name` set to `value`.
    ///
    /// Used by retry layers to replay the request with credentials.
    #[must_use]
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut request = self.clone();
        request
            .headers
            .insert(name.to_ascii_lowercase(), value.into());
        request
    }

    /// Replays this request with `authorization`, recording what was answered.
    pub(crate) fn retry_with(&self, authorization: String, answered: AnsweredChallenges) -> Self {
        let mut request = self.with_header("authorization", authorization);
        request.answered = answered;
        request
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - the URL is not an absolute `http`/`https` URL
    /// - `body` is `Some` but there is no `content-type` header
    /// - the method is `Put` but `body` is `None`
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        let url_ok = reqwest::Url::parse(&self.url)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if !url_ok {
            return Err(InvalidHttpRequestError::InvalidUrl {
                url: self.url.clone(),
            });
        }

        if self.body.is_some() && self.header("content-type").is_none() {
            return Err(InvalidHttpRequestError::MissingContentType);
        }

        if self.method == HttpMethod::Put && self.body.is_none() {
            return Err(InvalidHttpRequestError::MissingBody {
                method: self.method.to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: HttpMethod,
    url: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds a single header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the `Accept` header to the given media types.
    #[must_use]
    pub fn accept<S: AsRef<str>>(self, media_types: &[S]) -> Self {
        let value = media_types
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        if value.is_empty() {
            self
        } else {
            self.header("accept", value)
        }
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the body and its content type.
    #[must_use]
    pub fn body(self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        let mut builder = self.header("content-type", content_type);
        builder.body = Some(body.into());
        builder
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = HttpRequest {
            method: self.method,
            url: self.url,
            query: self.query,
            headers: self.headers,
            body: self.body,
            answered: AnsweredChallenges::default(),
        };
        request.verify()?;
        Ok(request)
    }
}
