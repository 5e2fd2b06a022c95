//! HTTP response types.
//!
//! This module provides the [`HttpResponse`] type and the parsed
//! [`PaginationInfo`] carried in `Link` headers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::auth::Challenge;
use crate::clients::errors::ClassifiedError;
use crate::clients::http_request::AnsweredChallenges;

/// Header carrying the content digest of a manifest or blob.
pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Pagination links parsed from `Link` headers (RFC 5988).
///
/// Targets are returned exactly as the server sent them; they may be
/// relative to the URL of the page that carried them.
///
/// # Example
///
/// ```rust
/// use registry_client::clients::PaginationInfo;
///
/// let info = PaginationInfo::parse_link_header(r#"</v2/_catalog?last=b&n=2>; rel="next""#);
/// assert_eq!(info.next.as_deref(), Some("/v2/_catalog?last=b&n=2"));
/// assert!(info.prev.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Target of the `rel="next"` link.
    pub next: Option<String>,
    /// Target of the `rel="prev"` (or `previous`) link.
    pub prev: Option<String>,
}

impl PaginationInfo {
    /// Parses a single `Link` header value.
    ///
    /// Handles several links per header, quoted or bare `rel` values,
    /// space separated relation lists, and targets without angle brackets.
    #[must_use]
    pub fn parse_link_header(header_value: &str) -> Self {
        let mut result = Self::default();

        for (target, rels) in parse_links(header_value) {
            for rel in rels {
                match rel.as_str() {
                    "next" if result.next.is_none() => result.next = Some(target.clone()),
                    "prev" | "previous" if result.prev.is_none() => {
                        result.prev = Some(target.clone());
                    }
                    _ => {}
                }
            }
        }

        result
    }

    /// Parses every `Link` header value, keeping the first match per relation.
    pub fn parse_link_headers<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        values
            .into_iter()
            .map(Self::parse_link_header)
            .fold(Self::default(), |acc, info| Self {
                next: acc.next.or(info.next),
                prev: acc.prev.or(info.prev),
            })
    }
}

/// Splits a `Link` header into `(target, relations)` pairs.
fn parse_links(value: &str) -> Vec<(String, Vec<String>)> {
    let mut links = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let (target, after_target) = if let Some(inner) = rest.strip_prefix('<') {
            match inner.find('>') {
                Some(end) => (&inner[..end], &inner[end + 1..]),
                None => break,
            }
        } else {
            let end = rest.find([';', ',']).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };

        let mut in_quotes = false;
        let mut params_end = after_target.len();
        for (i, c) in after_target.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    params_end = i;
                    break;
                }
                _ => {}
            }
        }
        let params = &after_target[..params_end];
        rest = &after_target[params_end..];

        let rels = params
            .split(';')
            .filter_map(|param| param.split_once('='))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
            .flat_map(|(_, value)| {
                value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect::<Vec<_>>()
            })
            .collect();

        let target = target.trim();
        if !target.is_empty() {
            links.push((target.to_string(), rels));
        }
    }

    links
}

/// An HTTP response returned by the transport chain.
///
/// The body is fully buffered. Header names are lowercased and may repeat.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The raw response body.
    pub body: Vec<u8>,
    /// Pagination links from the `Link` headers.
    pub pagination: PaginationInfo,
    pub(crate) answered: AnsweredChallenges,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing `Link` headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: Vec<u8>) -> Self {
        let headers: HashMap<String, Vec<String>> = headers
            .into_iter()
            .map(|(name, values)| (name.to_ascii_lowercase(), values))
            .collect();

        let pagination = headers
            .get("link")
            .map(|values| PaginationInfo::parse_link_headers(values.iter().map(String::as_str)))
            .unwrap_or_default();

        Self {
            code,
            headers,
            body,
            pagination,
            answered: AnsweredChallenges::default(),
        }
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value of a header by case-insensitive name.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Returns the `Docker-Content-Digest` header, if present.
    #[must_use]
    pub fn content_digest(&self) -> Option<&str> {
        self.header(DOCKER_CONTENT_DIGEST)
    }

    /// Returns the authentication challenges on this response.
    #[must_use]
    pub fn challenges(&self) -> Vec<Challenge> {
        Challenge::parse_all(self.header_values("www-authenticate"))
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifiedError`] of kind `ProtocolViolation` if the body
    /// does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClassifiedError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClassifiedError::protocol(format!("undecodable JSON body: {e}"))
                .with_status(self.code)
                .with_source(e)
        })
    }
}
