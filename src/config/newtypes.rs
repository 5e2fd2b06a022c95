//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fmt::Write as _;

/// A validated registry base URL.
///
/// The URL must use the `http` or `https` scheme and name a host. Any
/// trailing `/` is trimmed so that API paths can be appended directly.
///
/// # Example
///
/// ```rust
/// use registry_client::RegistryUrl;
///
/// let url = RegistryUrl::new("https://registry.example.com/").unwrap();
/// assert_eq!(url.as_ref(), "https://registry.example.com");
/// assert_eq!(url.join("/v2/"), "https://registry.example.com/v2/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryUrl(String);

impl RegistryUrl {
    /// Creates a new validated registry URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRegistryUrl`] if the URL cannot be parsed,
    /// does not use `http`/`https`, or has no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/').to_string();

        let parsed = reqwest::Url::parse(&trimmed)
            .map_err(|_| ConfigError::InvalidRegistryUrl { url: url.clone() })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::InvalidRegistryUrl { url });
        }

        Ok(Self(trimmed))
    }

    /// Appends an absolute API path (e.g. `/v2/`) to the base URL.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }
}

impl AsRef<str> for RegistryUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content digest of the form `<algorithm>:<hex>`.
///
/// Digests identify manifests and blobs by content. Only the shape is
/// validated: a non-empty lowercase algorithm, a colon, and a non-empty
/// lowercase hex encoded value.
///
/// # Example
///
/// ```rust
/// use registry_client::Digest;
///
/// let digest = Digest::sha256(b"hello");
/// assert_eq!(digest.algorithm(), "sha256");
/// assert!(digest.verify(b"hello"));
/// assert!(!digest.verify(b"goodbye"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest {
    value: String,
    separator: usize,
}

impl Digest {
    /// Parses and validates a digest string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDigest`] if the string is not of the
    /// form `<algorithm>:<hex>`.
    pub fn new(digest: impl Into<String>) -> Result<Self, ConfigError> {
        let value = digest.into().trim().to_string();

        let separator = value
            .find(':')
            .ok_or_else(|| ConfigError::InvalidDigest {
                digest: value.clone(),
            })?;

        let (algorithm, encoded) = (&value[..separator], &value[separator + 1..]);
        let algorithm_ok = !algorithm.is_empty()
            && algorithm.chars().all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
            });
        let encoded_ok = !encoded.is_empty()
            && encoded
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if !algorithm_ok || !encoded_ok {
            return Err(ConfigError::InvalidDigest { digest: value });
        }

        Ok(Self { value, separator })
    }

    /// Computes the `sha256` digest of the given bytes.
    #[must_use]
    pub fn sha256(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut value = String::with_capacity(7 + hash.len() * 2);
        value.push_str("sha256:");
        for byte in hash {
            let _ = write!(value, "{byte:02x}");
        }
        Self {
            value,
            separator: 6,
        }
    }

    /// Returns the algorithm portion (e.g. `sha256`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.value[..self.separator]
    }

    /// Returns the hex encoded portion.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.value[self.separator + 1..]
    }

    /// Returns `true` if `bytes` hash to this digest.
    ///
    /// Only `sha256` can be checked; other algorithms return `false`.
    #[must_use]
    pub fn verify(&self, bytes: &[u8]) -> bool {
        self.algorithm() == "sha256" && Self::sha256(bytes) == *self
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::str::FromStr for Digest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}
