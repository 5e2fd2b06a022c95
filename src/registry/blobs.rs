//! Blob existence checks.

use crate::clients::{ErrorKind, HttpMethod};
use crate::config::Digest;
use crate::registry::{RegistryClient, RegistryError};

impl RegistryClient {
    /// Returns `true` if the registry holds the blob `digest` in `repository`.
    ///
    /// # Errors
    ///
    /// A 404 is reported as `Ok(false)`; every other failure is returned.
    pub async fn has_blob(&self, repository: &str, digest: &Digest) -> Result<bool, RegistryError> {
        let (url, builder) =
            self.repository_request(HttpMethod::Head, repository, "blobs", digest.as_ref())?;
        let request = builder.build()?;

        let fields = [("repository", repository), ("digest", digest.as_ref())];
        match self.send("registry.blob.check", &request, &fields).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind == ErrorKind::ClientError && e.status == Some(404) => {
                tracing::debug!(%url, "blob not found");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
