//! Registry credentials.

use base64::Engine;
use std::fmt;

/// A username/password pair used for Basic auth and token exchanges.
///
/// Credentials are immutable once created and shared read-only by every
/// transport layer.
///
/// # Security
///
/// The `Debug` implementation masks the password.
///
/// # Example
///
/// ```rust
/// use registry_client::Credentials;
///
/// let credentials = Credentials::new("alice", "s3cret");
/// assert_eq!(credentials.username(), "alice");
/// assert_eq!(credentials.basic_authorization(), "Basic YWxpY2U6czNjcmV0");
/// assert!(!format!("{credentials:?}").contains("s3cret"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns `true` when both username and password are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// Returns the `Authorization` header value for HTTP Basic auth.
    #[must_use]
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_authorization_encodes_pair() {
        let credentials = Credentials::new("testuser", "testpass");
        assert_eq!(
            credentials.basic_authorization(),
            "Basic dGVzdHVzZXI6dGVzdHBhc3M="
        );
    }

    #[test]
    fn test_debug_masks_password() {
        let credentials = Credentials::new("testuser", "super-secret");
        let debug_output = format!("{credentials:?}");
        assert!(debug_output.contains("testuser"));
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_is_empty() {
        assert!(Credentials::new("", "").is_empty());
        assert!(!Credentials::new("user", "").is_empty());
    }
}
