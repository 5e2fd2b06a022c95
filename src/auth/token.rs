//! Bearer tokens and the shared token cache.
//!
//! A token obtained from a realm is valid for the `(realm, service, scope)`
//! triple it was requested for, until it expires. The [`TokenCache`] keeps
//! those tokens so that repeated challenges for the same scope do not trigger
//! a new exchange each time. It also remembers which scope each endpoint was
//! challenged for, so a later request to that endpoint can carry the token
//! from the start.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60;

/// Upper bound applied to `expires_in`.
const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Identifies what a token was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenScope {
    /// Token endpoint URL.
    pub realm: String,
    /// Service name, empty when the challenge had none.
    pub service: String,
    /// Requested scope, empty when the challenge had none.
    pub scope: String,
}

impl TokenScope {
    /// Creates a cache key from challenge parameters.
    #[must_use]
    pub fn new(realm: impl Into<String>, service: Option<&str>, scope: Option<&str>) -> Self {
        Self {
            realm: realm.into(),
            service: service.unwrap_or_default().to_string(),
            scope: scope.unwrap_or_default().to_string(),
        }
    }
}

/// A bearer credential with an optional expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// The opaque token string.
    pub value: String,
    /// When the token stops being valid.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Returns `true` if the token has an expiry in the past.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_authorization(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"*****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// JSON body returned by a token endpoint.
///
/// Registries disagree on the field name: Docker Hub sends `token`, OAuth2
/// servers send `access_token`, and some send both.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Docker-style token field.
    #[serde(default)]
    pub token: Option<String>,
    /// OAuth2-style token field.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Issue time (RFC 3339). Unparseable values are treated as absent.
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl TokenResponse {
    /// Converts the response into a [`Token`], preferring `token` over
    /// `access_token`. Returns `None` when neither holds a non-empty value.
    #[must_use]
    pub fn into_token(self) -> Option<Token> {
        let value = self
            .token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))?;

        let lifetime = self
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .min(MAX_TOKEN_LIFETIME_SECS);
        let issued_at = self
            .issued_at
            .as_deref()
            .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
            .map_or_else(Utc::now, |at| at.with_timezone(&Utc));

        Some(Token {
            value,
            expires_at: Some(issued_at + Duration::seconds(lifetime)),
        })
    }
}

/// Thread-safe cache of bearer tokens keyed by [`TokenScope`].
///
/// Reads take a shared lock; inserts and invalidations take the write lock.
/// Two requests racing to fill the same key both succeed: the later insert
/// simply replaces the earlier one. A poisoned lock behaves like an empty
/// cache rather than failing requests.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: RwLock<HashMap<TokenScope, Token>>,
    scopes: RwLock<HashMap<String, TokenScope>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a still-valid token for `scope`, if one is cached.
    #[must_use]
    pub fn get(&self, scope: &TokenScope) -> Option<Token> {
        let tokens = self.tokens.read().ok()?;
        tokens.get(scope).filter(|token| !token.expired()).cloned()
    }

    /// Stores a freshly exchanged token.
    pub fn insert(&self, scope: TokenScope, token: Token) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.retain(|_, cached| !cached.expired());
            tokens.insert(scope, token);
        }
    }

    /// Drops the token for `scope` if it is still the one that failed.
    ///
    /// A concurrent request may already have replaced it with a newer token,
    /// which is kept.
    pub fn invalidate(&self, scope: &TokenScope, failed: &Token) {
        if let Ok(mut tokens) = self.tokens.write() {
            if tokens.get(scope) == Some(failed) {
                tokens.remove(scope);
            }
        }
    }

    /// Records that requests to `endpoint` are challenged for `scope`.
    pub fn remember_scope(&self, endpoint: impl Into<String>, scope: TokenScope) {
        if let Ok(mut scopes) = self.scopes.write() {
            scopes.insert(endpoint.into(), scope);
        }
    }

    /// Returns a valid token for the scope `endpoint` was last challenged for.
    #[must_use]
    pub fn token_for_endpoint(&self, endpoint: &str) -> Option<(TokenScope, Token)> {
        let scope = self.scopes.read().ok()?.get(endpoint).cloned()?;
        let token = self.get(&scope)?;
        Some((scope, token))
    }

    /// Returns the number of cached tokens, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().map_or(0, |tokens| tokens.len())
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
