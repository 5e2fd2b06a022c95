//! Manifest retrieval, upload, and deletion.
//!
//! Manifests are handled as raw payloads plus their media type; the client
//! does not interpret the JSON. Use [`Manifest::json`] to decode it into a
//! shape of your own.

use std::borrow::Cow;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::clients::{ClassifiedError, ErrorKind, HttpMethod, HttpResponse};
use crate::config::Digest;
use crate::registry::{RegistryClient, RegistryError};

/// Docker image manifest, schema 1.
pub const MEDIA_TYPE_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
/// Signed Docker image manifest, schema 1.
pub const MEDIA_TYPE_SIGNED_MANIFEST_V1: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
/// Docker image manifest, schema 2.
pub const MEDIA_TYPE_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// Docker manifest list.
pub const MEDIA_TYPE_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// OCI image manifest.
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// OCI image index.
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// A manifest as stored by the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    /// The media type the registry reported (or the one it will be stored as).
    pub media_type: String,
    /// The content digest, when known.
    pub digest: Option<Digest>,
    /// The exact bytes of the manifest.
    pub payload: Vec<u8>,
}

impl Manifest {
    /// Creates a manifest for upload.
    #[must_use]
    pub fn new(media_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            media_type: media_type.into(),
            digest: None,
            payload: payload.into(),
        }
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolViolation` if the payload is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClassifiedError> {
        serde_json::from_slice(&self.payload).map_err(|e| {
            ClassifiedError::protocol(format!("undecodable manifest: {e}")).with_source(e)
        })
    }

    /// Returns the `sha256` digest of the payload.
    ///
    /// For a signed schema 1 manifest this is the digest of the payload
    /// without its signatures, which is what registries report.
    #[must_use]
    pub fn computed_digest(&self) -> Digest {
        if self.media_type == MEDIA_TYPE_SIGNED_MANIFEST_V1 {
            if let Ok(unsigned) = signed_payload(&self.payload) {
                return Digest::sha256(&unsigned);
            }
        }
        Digest::sha256(&self.payload)
    }
}

impl RegistryClient {
    /// Fetches a manifest, offering the given media types.
    ///
    /// When the registry sends a `sha256` `Docker-Content-Digest`, the
    /// payload is checked against it. Signed schema 1 manifests are checked
    /// with their signatures removed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] for transport failures, and a
    /// `ProtocolViolation` if the digest header is malformed or does not
    /// match the payload.
    pub async fn manifest(
        &self,
        repository: &str,
        reference: &str,
        accept: &[&str],
    ) -> Result<Manifest, RegistryError> {
        let (_, builder) =
            self.repository_request(HttpMethod::Get, repository, "manifests", reference)?;
        let request = builder.accept(accept).build()?;

        let fields = [("repository", repository), ("reference", reference)];
        let response = self.send("registry.manifest.get", &request, &fields).await?;

        let media_type = response
            .header("content-type")
            .map(|value| value.split(';').next().unwrap_or_default().trim().to_string())
            .or_else(|| accept.first().map(|s| (*s).to_string()))
            .unwrap_or_default();

        let digest = header_digest(&response)?;
        if let Some(digest) = digest.as_ref().filter(|d| d.algorithm() == "sha256") {
            let covered = if media_type == MEDIA_TYPE_SIGNED_MANIFEST_V1 {
                Cow::Owned(signed_payload(&response.body).map_err(|e| e.with_status(response.code))?)
            } else {
                Cow::Borrowed(response.body.as_slice())
            };
            if !digest.verify(&covered) {
                return Err(ClassifiedError::protocol(format!(
                    "manifest payload does not match digest {digest}"
                ))
                .with_status(response.code)
                .into());
            }
        }

        Ok(Manifest {
            media_type,
            digest,
            payload: response.body,
        })
    }

    /// Fetches a schema 1 manifest.
    ///
    /// # Errors
    ///
    /// See [`manifest`](Self::manifest).
    pub async fn manifest_v1(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Manifest, RegistryError> {
        self.manifest(
            repository,
            reference,
            &[MEDIA_TYPE_SIGNED_MANIFEST_V1, MEDIA_TYPE_MANIFEST_V1],
        )
        .await
    }

    /// Fetches a schema 2 manifest.
    ///
    /// # Errors
    ///
    /// See [`manifest`](Self::manifest).
    pub async fn manifest_v2(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Manifest, RegistryError> {
        self.manifest(repository, reference, &[MEDIA_TYPE_MANIFEST_V2])
            .await
    }

    /// Returns the digest of a manifest without downloading it.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolViolation` if the response has no valid
    /// `Docker-Content-Digest` header.
    pub async fn manifest_digest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Digest, RegistryError> {
        let (_, builder) =
            self.repository_request(HttpMethod::Head, repository, "manifests", reference)?;
        let request = builder
            .accept(&[
                MEDIA_TYPE_MANIFEST_V2,
                MEDIA_TYPE_MANIFEST_LIST,
                MEDIA_TYPE_OCI_MANIFEST,
                MEDIA_TYPE_OCI_INDEX,
            ])
            .build()?;

        let fields = [("repository", repository), ("reference", reference)];
        let response = self.send("registry.manifest.head", &request, &fields).await?;

        header_digest(&response)?.ok_or_else(|| {
            ClassifiedError::protocol("response has no Docker-Content-Digest header")
                .with_status(response.code)
                .into()
        })
    }

    /// Returns `true` if `reference` exists in `repository`.
    ///
    /// # Errors
    ///
    /// A 404 is reported as `Ok(false)`; every other failure is returned.
    pub async fn has_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<bool, RegistryError> {
        match self.manifest_digest(repository, reference).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == Some(ErrorKind::ClientError) && e.status() == Some(404) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Uploads a manifest under `reference`.
    ///
    /// Returns the digest the registry assigned, when it echoes one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the registry rejects the upload.
    pub async fn put_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<Option<Digest>, RegistryError> {
        let (_, builder) =
            self.repository_request(HttpMethod::Put, repository, "manifests", reference)?;
        let request = builder
            .body(manifest.payload.clone(), manifest.media_type.as_str())
            .build()?;

        let fields = [("repository", repository), ("reference", reference)];
        let response = self.send("registry.manifest.put", &request, &fields).await?;

        Ok(header_digest(&response)?)
    }

    /// Deletes the manifest identified by `digest`.
    ///
    /// Registries only accept deletion by digest, not by tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the registry refuses.
    pub async fn delete_manifest(
        &self,
        repository: &str,
        digest: &Digest,
    ) -> Result<(), RegistryError> {
        let (_, builder) = self.repository_request(
            HttpMethod::Delete,
            repository,
            "manifests",
            digest.as_ref(),
        )?;
        let request = builder.build()?;

        let fields = [("repository", repository), ("reference", digest.as_ref())];
        self.send("registry.manifest.delete", &request, &fields)
            .await?;
        Ok(())
    }
}

/// Parses `Docker-Content-Digest`, if present.
fn header_digest(response: &HttpResponse) -> Result<Option<Digest>, ClassifiedError> {
    response
        .content_digest()
        .map(|value| {
            Digest::new(value).map_err(|e| {
                ClassifiedError::protocol(format!("malformed Docker-Content-Digest '{value}'"))
                    .with_status(response.code)
                    .with_source(e)
            })
        })
        .transpose()
}

/// Recovers the unsigned payload of a signed schema 1 manifest.
///
/// The JWS `protected` header records how many leading bytes of the body
/// belong to the payload (`formatLength`) and the payload bytes that were
/// displaced by the `signatures` block (`formatTail`).
fn signed_payload(body: &[u8]) -> Result<Vec<u8>, ClassifiedError> {
    #[derive(Deserialize)]
    struct Signed {
        #[serde(default)]
        signatures: Vec<Signature>,
    }

    #[derive(Deserialize)]
    struct Signature {
        protected: String,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Protected {
        format_length: usize,
        format_tail: String,
    }

    let malformed =
        |what: &str| ClassifiedError::protocol(format!("malformed signed manifest: {what}"));

    let signed: Signed = serde_json::from_slice(body)
        .map_err(|e| malformed("undecodable JSON").with_source(e))?;
    let Some(signature) = signed.signatures.first() else {
        return Ok(body.to_vec());
    };

    let protected: Protected = decode_jose(&signature.protected)
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or_else(|| malformed("protected header"))?;
    let tail = decode_jose(&protected.format_tail).ok_or_else(|| malformed("formatTail"))?;
    let head = body
        .get(..protected.format_length)
        .ok_or_else(|| malformed("formatLength"))?;

    Ok([head, tail.as_slice()].concat())
}

fn decode_jose(value: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(value.trim_end_matches('=')).ok()
}
