//! Upstream transport subsystem.
//!
//! # Data Flow
//! ```text
//! Retry controller
//!     → UpstreamRequest (method, target URL, policy headers, buffered body)
//!     → Upstream::send (one attempt, one network call)
//!     → UpstreamResponse (status, headers, unbuffered body stream)
//! ```
//!
//! # Design Decisions
//! - The transport sits behind a trait so retry and dispatch logic can be
//!   driven without a network
//! - Response bodies are never buffered; they stream straight to the client
//! - Redirects are followed by the transport, so a 3xx reaching the caller
//!   is a final answer (e.g. 304 Not Modified)

pub mod client;

use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

pub use client::HttpUpstream;

/// Transport-level failure of a single attempt.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, DNS, TLS, redirect-limit or protocol failure.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("no response from upstream within {0:?}")]
    Timeout(Duration),

    /// Failure raised by a non-reqwest transport.
    #[error("{0}")]
    Other(String),
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Empty bodies are not sent.
    pub body: Bytes,
}

/// An upstream response whose body has not been read.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// Performs one forwarding attempt.
pub trait Upstream: Send + Sync {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, UpstreamError>> + Send;
}
