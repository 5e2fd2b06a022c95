//! High-level registry operations.
//!
//! [`RegistryClient`] wraps the transport chain with the endpoints of the
//! registry HTTP API:
//!
//! | Method | Endpoint |
//! |--------|----------|
//! | [`ping`](RegistryClient::ping) | `GET /v2/` |
//! | [`repositories`](RegistryClient::repositories) | `GET /v2/_catalog` (paginated) |
//! | [`tags`](RegistryClient::tags) | `GET /v2/<repo>/tags/list` (paginated) |
//! | [`manifest`](RegistryClient::manifest) | `GET /v2/<repo>/manifests/<ref>` |
//! | [`manifest_digest`](RegistryClient::manifest_digest) | `HEAD /v2/<repo>/manifests/<ref>` |
//! | [`put_manifest`](RegistryClient::put_manifest) | `PUT /v2/<repo>/manifests/<ref>` |
//! | [`delete_manifest`](RegistryClient::delete_manifest) | `DELETE /v2/<repo>/manifests/<digest>` |
//! | [`has_blob`](RegistryClient::has_blob) | `HEAD /v2/<repo>/blobs/<digest>` |

mod blobs;
mod client;
mod errors;
mod manifest;
mod tags;

pub use client::RegistryClient;
pub use errors::RegistryError;
pub use manifest::{
    Manifest, MEDIA_TYPE_MANIFEST_LIST, MEDIA_TYPE_MANIFEST_V1, MEDIA_TYPE_MANIFEST_V2,
    MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_OCI_MANIFEST, MEDIA_TYPE_SIGNED_MANIFEST_V1,
};
