//! Parsing of `WWW-Authenticate` challenges.
//!
//! Registries answer an unauthenticated request with `401 Unauthorized` and
//! one or more `WWW-Authenticate` headers. Each header names a scheme followed
//! by comma separated `key=value` parameters, where values may be quoted
//! strings that themselves contain commas:
//!
//! ```text
//! Bearer realm="https://auth.example.com/token",service="registry",scope="repository:app:pull,push"
//! Basic realm="Registry Realm"
//! ```

use std::collections::HashMap;

/// An authentication challenge issued by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Challenge {
    /// HTTP Basic authentication.
    Basic {
        /// Protection space, if the server named one.
        realm: Option<String>,
    },
    /// OAuth2-style bearer token authentication.
    Bearer {
        /// Token endpoint URL. A missing realm is kept as `None` so the token
        /// layer can report the challenge as malformed.
        realm: Option<String>,
        /// Service name passed to the token endpoint.
        service: Option<String>,
        /// Requested scope passed to the token endpoint.
        scope: Option<String>,
    },
}

impl Challenge {
    /// Parses a single `WWW-Authenticate` header value.
    ///
    /// Returns `None` for empty values and schemes other than Basic and Bearer.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let header_value = header_value.trim();
        let (scheme, rest) = header_value
            .split_once(char::is_whitespace)
            .unwrap_or((header_value, ""));
        let params = parse_params(rest);
        let take = |key: &str| params.get(key).cloned();

        if scheme.eq_ignore_ascii_case("basic") {
            Some(Self::Basic {
                realm: take("realm"),
            })
        } else if scheme.eq_ignore_ascii_case("bearer") {
            Some(Self::Bearer {
                realm: take("realm"),
                service: take("service"),
                scope: take("scope"),
            })
        } else {
            None
        }
    }

    /// Parses every header value, skipping ones that are not understood.
    pub fn parse_all<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
        values.into_iter().filter_map(Self::parse).collect()
    }

    /// Returns `true` for [`Challenge::Basic`].
    #[must_use]
    pub const fn is_basic(&self) -> bool {
        matches!(self, Self::Basic { .. })
    }

    /// Returns `true` for [`Challenge::Bearer`].
    #[must_use]
    pub const fn is_bearer(&self) -> bool {
        matches!(self, Self::Bearer { .. })
    }
}

/// Splits `key=value, key="quoted, value"` into a map with lowercased keys.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.trim().is_empty() && chars.peek().is_none() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value = value.trim().to_string();
            }
        }

        let key = key.trim().to_ascii_lowercase();
        if !key.is_empty() {
            params.insert(key, value);
        }
    }

    params
}
