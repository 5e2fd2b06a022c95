//! HTTP plumbing for registry API communication.
//!
//! This module provides the request/response types, the authenticated
//! transport chain, the error taxonomy, and Link-header pagination.
//!
//! # Overview
//!
//! - [`HttpRequest`]: a replayable request template
//! - [`HttpResponse`]: a fully buffered response
//! - [`Transport`]: one layer of the chain
//! - [`TransportChain`]: error mapping, Basic and Bearer auth over the network
//! - [`Paginator`]: follows `rel="next"` links across JSON pages
//! - [`ClassifiedError`] and [`ErrorKind`]: the failure taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_client::clients::{HttpMethod, HttpRequest, TransportChain};
//!
//! let chain = TransportChain::from_config(&config)?;
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "https://r.example.com/v2/")
//!     .build()
//!     .unwrap();
//!
//! let response = chain.execute(&request).await?;
//! ```
//!
//! # Retry Behavior
//!
//! - **401 with `Basic`**: replayed once with the configured credentials
//! - **401 with `Bearer`**: one token exchange, then replayed once with the token
//! - **Everything else**: returned immediately; server errors are not retried

mod errors;
mod http_request;
mod http_response;
mod paginator;
mod transport;

pub use errors::{ApiErrorDetail, ClassifiedError, ErrorKind, InvalidHttpRequestError};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{HttpResponse, PaginationInfo, DOCKER_CONTENT_DIGEST};
pub use paginator::{Page, Paginator};
pub use transport::{
    BasicTransport, ErrorTransport, HttpTransport, TokenTransport, Transport, TransportChain,
    CLIENT_VERSION,
};
