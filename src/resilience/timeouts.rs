//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound each upstream attempt by the time to response headers
//! - Leave the relayed body unbounded (live streams run indefinitely)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timed-out attempt is a transport failure and is retried like one

use std::future::Future;
use std::time::Duration;

use crate::upstream::UpstreamError;

/// Run `fut`, failing with [`UpstreamError::Timeout`] once `deadline` passes.
pub async fn with_response_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<UpstreamError>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(UpstreamError::Timeout(deadline)),
    }
}
