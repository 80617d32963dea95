//! Retry logic.
//!
//! # Responsibilities
//! - Drive one or more forwarding attempts for a single inbound request
//! - Classify each attempt as success, client error, or retryable failure
//! - Sleep with capped exponential backoff between attempts
//! - Produce the final client response on every path
//!
//! # State Transitions
//! ```text
//! Attempting(n) → Success:             2xx/3xx (redirects already followed)
//! Attempting(n) → ClientError:         4xx, never retried
//! Attempting(n) → RetryableFailure(n): 5xx or transport error, n < max
//! RetryableFailure(n) → Attempting(n+1): after backoff(n)
//! Attempting(n) → Exhausted:           failing and n == max, answered 502
//! ```
//!
//! # Design Decisions
//! - `max_attempts` bounds total network calls, not retries
//! - An explicit loop with local state; the attempt counter never outlives
//!   the request
//! - The sleep is a yielding suspension point behind a trait so tests can
//!   record delays instead of waiting

use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;

use crate::config::RetryConfig;
use crate::http::response;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::routing::TargetUrl;
use crate::security::headers::HeaderPolicy;
use crate::upstream::{Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};

/// Suspension point between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Everything an attempt needs from the inbound request. Built once and
/// reused unchanged by every attempt.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub target: TargetUrl,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub streaming: bool,
}

/// Result of one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(UpstreamResponse),
    ClientError(StatusCode),
    Retryable(FailureReason),
}

/// Why an attempt failed in a retryable way.
#[derive(Debug)]
pub enum FailureReason {
    Status(StatusCode),
    Transport(UpstreamError),
}

impl FailureReason {
    fn label(&self) -> &'static str {
        match self {
            FailureReason::Status(_) => "status",
            FailureReason::Transport(UpstreamError::Timeout(_)) => "timeout",
            FailureReason::Transport(_) => "transport",
        }
    }

    fn message(&self) -> String {
        match self {
            FailureReason::Status(status) => format!("upstream responded with {status}"),
            FailureReason::Transport(err) => error_chain(err),
        }
    }
}

/// `err` followed by its sources, so reqwest's terse top-level message keeps
/// the underlying cause (DNS, refused, redirect loop).
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

/// 2xx and 3xx are final successes; 4xx are never retried; anything else
/// (5xx, transport failure, or an unexpected status) is retryable.
pub fn classify(result: Result<UpstreamResponse, UpstreamError>) -> AttemptOutcome {
    match result {
        Ok(upstream) if upstream.status.is_success() || upstream.status.is_redirection() => {
            AttemptOutcome::Success(upstream)
        }
        Ok(upstream) if upstream.status.is_client_error() => {
            AttemptOutcome::ClientError(upstream.status)
        }
        Ok(upstream) => AttemptOutcome::Retryable(FailureReason::Status(upstream.status)),
        Err(err) => AttemptOutcome::Retryable(FailureReason::Transport(err)),
    }
}

/// Runs the attempt loop for one inbound request.
pub struct RetryController<'a, U, S> {
    upstream: &'a U,
    sleeper: &'a S,
    policy: &'a RetryConfig,
    headers: &'a HeaderPolicy,
}

impl<'a, U: Upstream, S: Sleeper> RetryController<'a, U, S> {
    pub fn new(upstream: &'a U, sleeper: &'a S, policy: &'a RetryConfig, headers: &'a HeaderPolicy) -> Self {
        Self {
            upstream,
            sleeper,
            policy,
            headers,
        }
    }

    /// Forward until success, a client error, or exhaustion.
    pub async fn forward(&self, request: &ForwardRequest) -> Response {
        let max_attempts = self.policy.max_attempts.max(1);
        let target = request.target.as_str();
        let mut attempt = 1;

        loop {
            let outbound = UpstreamRequest {
                method: request.method.clone(),
                url: request.target.url().clone(),
                headers: self.headers.upstream_headers(&request.headers, &request.target),
                body: request.body.clone(),
            };

            let reason = match classify(self.upstream.send(outbound).await) {
                AttemptOutcome::Success(upstream) => {
                    tracing::debug!(
                        target_url = %target,
                        attempt,
                        status = %upstream.status,
                        streaming = request.streaming,
                        "Upstream responded"
                    );
                    return response::finish(upstream, request.streaming);
                }
                AttemptOutcome::ClientError(status) => {
                    tracing::info!(target_url = %target, attempt, status = %status, "Upstream client error, not retrying");
                    return response::client_error(status, target);
                }
                AttemptOutcome::Retryable(reason) => reason,
            };

            if attempt >= max_attempts {
                let message = reason.message();
                tracing::error!(target_url = %target, attempts = attempt, error = %message, "Upstream attempts exhausted");
                metrics::record_exhausted();
                return response::exhausted(target, &message, attempt);
            }

            let delay = calculate_backoff(attempt, self.policy);
            tracing::warn!(
                target_url = %target,
                attempt,
                max_attempts,
                delay = ?delay,
                error = %reason.message(),
                "Retrying upstream request"
            );
            metrics::record_retry(reason.label());
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE, USER_AGENT};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted attempt results and records what was sent.
    struct ScriptedUpstream {
        script: Mutex<VecDeque<Result<UpstreamResponse, UpstreamError>>>,
        sent: Mutex<Vec<UpstreamRequest>>,
    }

    impl ScriptedUpstream {
        fn new(script: Vec<Result<UpstreamResponse, UpstreamError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Upstream for ScriptedUpstream {
        async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
            self.sent.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamError::Other("script exhausted".into())))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn status(code: u16) -> Result<UpstreamResponse, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/vnd.apple.mpegurl".parse().unwrap());
        Ok(UpstreamResponse::new(StatusCode::from_u16(code).unwrap(), headers, "body"))
    }

    fn refused() -> Result<UpstreamResponse, UpstreamError> {
        Err(UpstreamError::Other("connection refused".into()))
    }

    fn request(target: &str, streaming: bool) -> ForwardRequest {
        ForwardRequest {
            method: Method::GET,
            target: TargetUrl::parse(target).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            streaming,
        }
    }

    async fn run(
        script: Vec<Result<UpstreamResponse, UpstreamError>>,
        req: &ForwardRequest,
    ) -> (Response, usize, Vec<Duration>) {
        let upstream = ScriptedUpstream::new(script);
        let sleeper = RecordingSleeper::default();
        let policy = RetryConfig::default();
        let headers = HeaderPolicy::default();
        let response = RetryController::new(&upstream, &sleeper, &policy, &headers)
            .forward(req)
            .await;
        let delays = sleeper.delays.lock().unwrap().clone();
        (response, upstream.calls(), delays)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let req = request("https://example.com/file.json", false);
        let (response, calls, delays) = run(vec![status(200)], &req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
        assert!(delays.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let req = request("https://cdn.example.com/missing.m3u8", true);
        let (response, calls, delays) = run(vec![status(404), status(200)], &req).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls, 1);
        assert!(delays.is_empty());
        let body = body_json(response).await;
        assert_eq!(body["message"], "Resource not found");
        assert_eq!(body["targetUrl"], "https://cdn.example.com/missing.m3u8");
    }

    #[tokio::test]
    async fn test_server_errors_then_success() {
        let req = request("https://cdn.example.com/live/index.m3u8", true);
        let (response, calls, delays) =
            run(vec![status(503), status(503), status(200)], &req).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 3);
        assert_eq!(delays, vec![Duration::from_millis(500), Duration::from_millis(1000)]);
        assert_eq!(response.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/vnd.apple.mpegurl");
    }

    #[tokio::test]
    async fn test_transport_failures_exhaust() {
        let req = request("https://cdn.example.com/a.ts", true);
        let (response, calls, delays) = run(vec![refused(), refused(), refused()], &req).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(calls, 3);
        assert_eq!(delays, vec![Duration::from_millis(500), Duration::from_millis(1000)]);
        let body = body_json(response).await;
        assert_eq!(body["attempts"], 3);
        assert_eq!(body["message"], "connection refused");
        assert_eq!(body["targetUrl"], "https://cdn.example.com/a.ts");
    }

    #[tokio::test]
    async fn test_server_error_on_last_attempt_exhausts() {
        let req = request("https://example.com/api", false);
        let (response, calls, _) = run(vec![status(500), refused(), status(502)], &req).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(calls, 3);
        let body = body_json(response).await;
        assert_eq!(body["attempts"], 3);
        assert_eq!(body["message"], "upstream responded with 502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_client_error_after_retry() {
        let req = request("https://example.com/api", false);
        let (response, calls, delays) = run(vec![status(503), status(403)], &req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls, 2);
        assert_eq!(delays.len(), 1);
    }

    #[tokio::test]
    async fn test_longer_policy_delays_are_capped() {
        let upstream = ScriptedUpstream::new((0..6).map(|_| refused()).collect());
        let sleeper = RecordingSleeper::default();
        let policy = RetryConfig {
            max_attempts: 6,
            ..RetryConfig::default()
        };
        let headers = HeaderPolicy::default();
        let req = request("https://example.com/a.ts", true);

        let response = RetryController::new(&upstream, &sleeper, &policy, &headers)
            .forward(&req)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let millis: Vec<u128> = sleeper.delays.lock().unwrap().iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![500, 1000, 2000, 3000, 3000]);
    }

    #[tokio::test]
    async fn test_every_attempt_uses_policy_headers() {
        let upstream = ScriptedUpstream::new(vec![status(500), status(204)]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryConfig::default();
        let headers = HeaderPolicy::default();
        let mut req = request("https://cdn.example.com:8443/a.flv", true);
        req.headers.insert("x-forwarded-for", "1.1.1.1".parse().unwrap());
        req.headers.insert("range", "bytes=10-".parse().unwrap());

        RetryController::new(&upstream, &sleeper, &policy, &headers)
            .forward(&req)
            .await;

        let sent = upstream.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        for outbound in sent.iter() {
            assert_eq!(outbound.url.as_str(), "https://cdn.example.com:8443/a.flv");
            assert_eq!(outbound.headers["host"], "cdn.example.com:8443");
            assert_eq!(outbound.headers["range"], "bytes=10-");
            assert!(outbound.headers.contains_key(USER_AGENT));
            assert!(!outbound.headers.contains_key("x-forwarded-for"));
        }
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify(status(200)), AttemptOutcome::Success(_)));
        assert!(matches!(classify(status(304)), AttemptOutcome::Success(_)));
        assert!(matches!(classify(status(429)), AttemptOutcome::ClientError(s) if s == 429));
        assert!(matches!(classify(status(500)), AttemptOutcome::Retryable(FailureReason::Status(_))));
        assert!(matches!(classify(refused()), AttemptOutcome::Retryable(FailureReason::Transport(_))));
    }
}
