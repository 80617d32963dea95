//! Header manipulation.
//!
//! # Responsibilities
//! - Build the upstream request header set (player identity, forwarded
//!   client headers, forced Host)
//! - Strip caching headers from relayed responses
//! - Add permissive CORS headers to every relayed response
//!
//! # Design Decisions
//! - Defaults are seeded first and win over client headers of the same name,
//!   except the conditional/auth headers which are copied over them
//! - Edge and forwarding headers (`cf-*`, `x-forwarded-*`, client IP) are
//!   never passed upstream
//! - Relayed content is never cacheable; upstream freshness cannot be
//!   guaranteed through the rewrite

use axum::http::{
    header::{
        ACCEPT, ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, AGE,
        AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, COOKIE, ETAG, EXPIRES, HOST,
        IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, PRAGMA, RANGE, TRANSFER_ENCODING,
        USER_AGENT,
    },
    HeaderMap, HeaderName, HeaderValue,
};

use crate::config::schema::DEFAULT_USER_AGENT;
use crate::routing::TargetUrl;

/// Client headers copied verbatim ahead of everything else.
pub const FORWARDED_PRIORITY: [HeaderName; 5] =
    [RANGE, IF_NONE_MATCH, IF_MODIFIED_SINCE, AUTHORIZATION, COOKIE];

/// Client header name prefixes never forwarded upstream.
pub const EXCLUDED_PREFIXES: &[&str] = &["cf-", "x-forwarded-", "x-real-ip", "x-client-ip"];

/// Client headers the transport owns.
const SKIPPED: [HeaderName; 4] = [HOST, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING];

/// Upstream caching headers removed from every relayed response.
pub const CACHE_HEADERS: [HeaderName; 6] = [CACHE_CONTROL, PRAGMA, EXPIRES, ETAG, LAST_MODIFIED, AGE];

const CORS_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, HEAD";
const STREAMING_MAX_AGE: &str = "86400";

/// Builds outbound request headers. Constructed once at startup.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    defaults: HeaderMap,
}

impl HeaderPolicy {
    /// Policy presenting the given user agent. Falls back to the default
    /// player identity if the value is not a legal header.
    pub fn new(user_agent: &str) -> Self {
        let user_agent = HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));

        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, user_agent);
        defaults.insert(ACCEPT, HeaderValue::from_static("*/*"));
        defaults.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        defaults.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        Self { defaults }
    }

    /// Build the header set for one upstream attempt.
    pub fn upstream_headers(&self, inbound: &HeaderMap, target: &TargetUrl) -> HeaderMap {
        let mut out = self.defaults.clone();

        for name in &FORWARDED_PRIORITY {
            copy_all(inbound, &mut out, name, true);
        }

        for name in inbound.keys() {
            if out.contains_key(name) || SKIPPED.contains(name) || is_excluded(name) {
                continue;
            }
            copy_all(inbound, &mut out, name, false);
        }

        if let Ok(host) = HeaderValue::from_str(&target.host_header()) {
            out.insert(HOST, host);
        }
        out
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

fn copy_all(from: &HeaderMap, to: &mut HeaderMap, name: &HeaderName, replace: bool) {
    let mut values = from.get_all(name).iter();
    let Some(first) = values.next() else {
        return;
    };
    if replace {
        to.insert(name.clone(), first.clone());
    } else {
        to.append(name.clone(), first.clone());
    }
    for value in values {
        to.append(name.clone(), value.clone());
    }
}

/// HeaderName is always lowercase, so prefix checks are case-insensitive.
fn is_excluded(name: &HeaderName) -> bool {
    let name = name.as_str();
    EXCLUDED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Remove every caching header.
pub fn strip_cache_headers(headers: &mut HeaderMap) {
    for name in &CACHE_HEADERS {
        headers.remove(name);
    }
}

/// Add permissive CORS headers; streaming responses also get a max-age.
pub fn apply_cors(headers: &mut HeaderMap, streaming: bool) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
    if streaming {
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(STREAMING_MAX_AGE));
    }
}
