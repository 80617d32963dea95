//! Request identification.
//!
//! Every inbound request gets an `x-request-id` (kept if the client sent
//! one) which is echoed on the response and recorded on the trace span.
//! Only a client-supplied id travels upstream.

use axum::{
    body::Body,
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Extension marking a request that arrived with its own `x-request-id`.
#[derive(Debug, Clone, Copy)]
pub struct ClientRequestId;

/// Runs ahead of the request-id layer so generated ids can be told apart.
pub async fn mark_client_request_id(mut request: Request<Body>, next: Next) -> Response {
    if request.headers().contains_key(X_REQUEST_ID) {
        request.extensions_mut().insert(ClientRequestId);
    }
    next.run(request).await
}

/// Drop the relay-generated id from headers bound upstream.
pub fn strip_generated_id(headers: &mut HeaderMap, extensions: &Extensions) {
    if extensions.get::<ClientRequestId>().is_none() {
        headers.remove(X_REQUEST_ID);
    }
}

/// Request ID of an inbound request, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
