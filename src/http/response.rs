//! Response finishing.
//!
//! # Responsibilities
//! - Turn a successful upstream response into the client response, in an
//!   ordinary or a streaming variant
//! - Render the JSON error bodies (client error, exhaustion, bad target)
//!
//! # Design Decisions
//! - Bodies are passed through as streams, never collected
//! - Both variants strip caching headers and add CORS; the streaming variant
//!   also pins keep-alive, range support, and the upstream entity headers
//! - Error bodies are UTF-8 JSON with an accurate status code

use axum::{
    body::Body,
    http::{
        header::{ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_ORIGIN, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::Response,
};
use serde::Serialize;

use crate::security::headers::{apply_cors, strip_cache_headers};
use crate::upstream::UpstreamResponse;

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Finish a successful upstream response using the variant picked by the
/// request's streaming flag.
pub fn finish(upstream: UpstreamResponse, streaming: bool) -> Response {
    if streaming {
        finish_streaming(upstream)
    } else {
        finish_ordinary(upstream)
    }
}

pub fn finish_ordinary(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse { status, mut headers, body } = upstream;
    strip_cache_headers(&mut headers);
    apply_cors(&mut headers, false);
    build(status, headers, body)
}

pub fn finish_streaming(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse { status, mut headers, body } = upstream;
    let content_type = headers.get(CONTENT_TYPE).cloned();
    let content_length = headers.get(CONTENT_LENGTH).cloned();

    strip_cache_headers(&mut headers);
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    if !headers.contains_key(ACCEPT_RANGES) {
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if let Some(value) = content_type {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Some(value) = content_length {
        headers.insert(CONTENT_LENGTH, value);
    }

    apply_cors(&mut headers, true);
    build(status, headers, body)
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Human-readable classification of an upstream status.
pub fn error_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Malformed request",
        401 => "Authentication required",
        403 => "Access denied - possibly hotlink protection or an IP restriction",
        404 => "Resource not found",
        429 => "Too many requests, please retry later",
        500 => "Upstream internal server error",
        502 => "Bad gateway",
        503 => "Service temporarily unavailable",
        504 => "Gateway timeout",
        _ => "Unknown error",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientErrorBody<'a> {
    status: u16,
    status_text: &'static str,
    target_url: &'a str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExhaustedBody<'a> {
    error: &'static str,
    message: &'a str,
    target_url: &'a str,
    attempts: u32,
    suggestion: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectedBody<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<&'a str>,
}

/// Upstream answered 4xx: relay the status with a classified JSON body.
pub fn client_error(status: StatusCode, target_url: &str) -> Response {
    json(
        status,
        &ClientErrorBody {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or(""),
            target_url,
            message: error_message(status),
        },
    )
}

/// Every attempt failed.
pub fn exhausted(target_url: &str, message: &str, attempts: u32) -> Response {
    json(
        StatusCode::BAD_GATEWAY,
        &ExhaustedBody {
            error: "Proxy request failed",
            message,
            target_url,
            attempts,
            suggestion: "Check that the target URL is correct, or try again later",
        },
    )
}

/// The request was refused before any upstream call.
pub fn rejected(status: StatusCode, message: &str, target_url: Option<&str>) -> Response {
    json(
        status,
        &RejectedBody {
            error: "Invalid proxy request",
            message,
            target_url,
        },
    )
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
