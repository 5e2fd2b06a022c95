//! Link-header driven pagination.
//!
//! List endpoints return one JSON page per request and point at the next
//! page with a `Link: <...>; rel="next"` header. The [`Paginator`] follows
//! those links until a page arrives without one.
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_client::clients::Paginator;
//!
//! #[derive(serde::Deserialize)]
//! struct Catalog { repositories: Vec<String> }
//!
//! let pages: Vec<Catalog> = Paginator::new(&chain)
//!     .fetch_all("https://r.example.com/v2/_catalog?n=100")
//!     .await?;
//! ```

use std::collections::HashSet;

use serde::de::DeserializeOwned;

use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::transport::Transport;
use crate::config::LogHook;

/// One decoded page and the absolute URL of the page after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    /// The decoded body.
    pub data: T,
    /// Absolute URL of the next page, `None` on the last page.
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Returns `true` if another page follows.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.next.is_some()
    }
}

/// Fetches JSON pages through a [`Transport`].
///
/// Responses are classified even when the transport is not a full chain, so
/// a page with a status of 400 or above always fails.
#[derive(Debug)]
pub struct Paginator<'a> {
    transport: &'a dyn Transport,
    log: Option<(&'a LogHook, &'a str)>,
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator over `transport`.
    #[must_use]
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            log: None,
            fields: Vec::new(),
        }
    }

    /// Reports every page request to `hook` as `operation`.
    #[must_use]
    pub fn with_log(mut self, hook: &'a LogHook, operation: &'a str) -> Self {
        self.log = Some((hook, operation));
        self
    }

    /// Adds a `key=value` field to each log line.
    #[must_use]
    pub fn field(mut self, key: &'a str, value: &'a str) -> Self {
        self.fields.push((key, value));
        self
    }

    /// Fetches and decodes a single page.
    ///
    /// A relative `next` link is resolved against `url`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClassifiedError`], or a
    /// `ProtocolViolation` if the body does not decode into `T` or the
    /// `next` link is not a valid URL.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Page<T>, ClassifiedError> {
        let request = HttpRequest::builder(HttpMethod::Get, url)
            .header("accept", "application/json")
            .build()
            .map_err(|e| ClassifiedError::protocol(format!("invalid page URL '{url}'")).with_source(e))?;

        if let Some((hook, operation)) = self.log {
            hook.call(operation, url, &self.fields);
        }

        let response = self.transport.round_trip(&request).await?;
        let response = ClassifiedError::classify(response)?;
        let data = response.json::<T>()?;

        let next = match response.pagination.next.as_deref() {
            Some(link) => Some(resolve(url, link)?),
            None => None,
        };

        Ok(Page { data, next })
    }

    /// Fetches every page starting at `url`, in order.
    ///
    /// The loop ends on the first page without a `next` link. Nothing is
    /// returned unless every page was fetched.
    ///
    /// # Errors
    ///
    /// Returns the first page's error, discarding pages fetched so far, or a
    /// `ProtocolViolation` if a `next` link points at a page already fetched
    /// in this call.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, ClassifiedError> {
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut current = url.to_string();

        loop {
            if !visited.insert(normalize(&current)) {
                return Err(ClassifiedError::protocol(format!(
                    "pagination cycle: {current} was already fetched"
                )));
            }

            let page = self.fetch_page::<T>(&current).await?;
            pages.push(page.data);

            match page.next {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(pages)
    }
}

/// Resolves a `Link` target against the URL of the page that carried it.
fn resolve(base: &str, link: &str) -> Result<String, ClassifiedError> {
    reqwest::Url::parse(base)
        .and_then(|base| base.join(link))
        .map(String::from)
        .map_err(|e| {
            ClassifiedError::protocol(format!("invalid next link '{link}'")).with_source(e)
        })
}

/// Canonical form used for cycle detection.
fn normalize(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(|_| url.to_string(), String::from)
}
