//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID, handler deadline)
//! - Bind server to listener and drain on shutdown
//! - Dispatch: extract target, classify, serve the page or forward

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, RetryConfig};
use crate::http::landing;
use crate::http::request::{mark_client_request_id, request_id, strip_generated_id, UuidRequestId};
use crate::http::response;
use crate::observability::metrics;
use crate::resilience::{ForwardRequest, RetryController, TokioSleeper};
use crate::routing::{extract_target, is_streaming, TargetUrl};
use crate::security::headers::HeaderPolicy;
use crate::security::limits::buffer_body;
use crate::upstream::{HttpUpstream, Upstream, UpstreamError};

/// Read-only state shared by all requests.
pub struct AppState<U> {
    pub upstream: Arc<U>,
    pub header_policy: Arc<HeaderPolicy>,
    pub retry_config: RetryConfig,
    pub max_body_size: usize,
}

impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            header_policy: self.header_policy.clone(),
            retry_config: self.retry_config.clone(),
            max_body_size: self.max_body_size,
        }
    }
}

impl<U> AppState<U> {
    pub fn new(config: &ProxyConfig, upstream: U) -> Self {
        Self {
            upstream: Arc::new(upstream),
            header_policy: Arc::new(HeaderPolicy::new(&config.upstream.user_agent)),
            retry_config: config.retries.clone(),
            max_body_size: config.security.max_body_size,
        }
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, UpstreamError> {
        let upstream = HttpUpstream::new(&config.upstream, &config.timeouts)?;
        let state = AppState::new(&config, upstream);
        let router = build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<U: Upstream + 'static>(config: &ProxyConfig, state: AppState<U>) -> Router {
    Router::new()
        .route("/", any(proxy_handler::<U>))
        .route("/{*path}", any(proxy_handler::<U>))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .layer(middleware::from_fn(mark_client_request_id))
}

/// Dispatch one inbound request.
async fn proxy_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();

    let raw_target = match extract_target(request.uri().path()) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            let hostname = landing::request_hostname(request.headers(), request.uri());
            return landing::config_page(&hostname);
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Undecodable target");
            return response::rejected(StatusCode::BAD_REQUEST, &e.to_string(), None);
        }
    };

    let target = match TargetUrl::parse(raw_target.as_str()) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(request_id = %request_id, target_url = %raw_target, error = %e, "Invalid target");
            return response::rejected(StatusCode::BAD_REQUEST, &e.to_string(), Some(raw_target.as_str()));
        }
    };

    let streaming = is_streaming(target.as_str(), request.headers());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        target_url = %target,
        streaming,
        "Forwarding request"
    );

    let (mut parts, body) = request.into_parts();
    strip_generated_id(&mut parts.headers, &parts.extensions);
    let body = match buffer_body(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            return response::rejected(StatusCode::PAYLOAD_TOO_LARGE, &e.to_string(), Some(target.as_str()));
        }
    };

    let forward = ForwardRequest {
        method: parts.method,
        target,
        headers: parts.headers,
        body,
        streaming,
    };

    let controller = RetryController::new(
        state.upstream.as_ref(),
        &TokioSleeper,
        &state.retry_config,
        state.header_policy.as_ref(),
    );
    let response = controller.forward(&forward).await;

    metrics::record_request(method.as_str(), response.status().as_u16(), streaming, start_time);
    response
}
