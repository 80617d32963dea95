//! Request body limits.
//!
//! # Design Decisions
//! - Inbound bodies are buffered once so every retry can replay them
//! - Anything over the configured size is refused with 413 before any
//!   upstream call

use axum::body::{Body, Bytes};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("request body exceeds {limit} bytes or could not be read")]
pub struct BodyLimitError {
    pub limit: usize,
}

/// Collect the inbound body, refusing anything larger than `limit`.
pub async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, BodyLimitError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| BodyLimitError { limit })
}
