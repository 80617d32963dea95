//! Streaming traffic classification.
//!
//! # Responsibilities
//! - Match a target URL against live-media URL shapes
//! - Sniff the inbound Content-Type for media payloads
//! - Combine both into the per-request streaming flag
//!
//! # Design Decisions
//! - Matching is case-insensitive and deliberately broad; a false positive
//!   only changes response header policy, never where the request goes
//! - Suffixes are checked against both the full URL and its path, so a
//!   signed `a.m3u8?token=...` playlist still counts
//! - No regex; patterns are a fixed static table

use axum::http::{header::CONTENT_TYPE, HeaderMap};

/// A single URL shape that marks a target as live media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPattern {
    /// URL starts with this scheme prefix.
    Scheme(&'static str),
    /// URL (or its path) ends with this extension.
    Suffix(&'static str),
    /// Keyword appears anywhere in the URL.
    Keyword(&'static str),
}

/// Patterns identifying streaming targets. All lowercase.
pub const STREAMING_URL_PATTERNS: &[UrlPattern] = &[
    UrlPattern::Scheme("rtmp://"),
    UrlPattern::Scheme("rtmps://"),
    UrlPattern::Suffix(".flv"),
    UrlPattern::Suffix(".m3u8"),
    UrlPattern::Suffix(".ts"),
    UrlPattern::Suffix(".mp4"),
    UrlPattern::Suffix(".webm"),
    UrlPattern::Keyword("hls"),
    UrlPattern::Keyword("dash"),
    UrlPattern::Keyword("stream"),
    UrlPattern::Keyword("live"),
    UrlPattern::Keyword("broadcast"),
];

/// Content types of inbound media payloads.
pub const STREAMING_CONTENT_TYPES: &[&str] = &[
    "video/",
    "application/x-rtmp",
    "application/vnd.apple.mpegurl",
    "application/dash+xml",
];

impl UrlPattern {
    /// `url` and `path` must already be lowercased.
    fn matches(&self, url: &str, path: &str) -> bool {
        match *self {
            UrlPattern::Scheme(prefix) => url.starts_with(prefix),
            UrlPattern::Suffix(ext) => url.ends_with(ext) || path.ends_with(ext),
            UrlPattern::Keyword(word) => url.contains(word),
        }
    }
}

/// Returns true if the target URL looks like a live-media resource.
pub fn is_streaming_target(target: &str) -> bool {
    let url = target.to_ascii_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or(url.as_str());
    STREAMING_URL_PATTERNS
        .iter()
        .any(|pattern| pattern.matches(&url, path))
}

/// Returns true if the inbound request carries a media Content-Type.
pub fn is_streaming_request(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            STREAMING_CONTENT_TYPES.iter().any(|marker| ct.contains(marker))
        })
        .unwrap_or(false)
}

/// The streaming flag for one inbound request, fixed across retries.
pub fn is_streaming(target: &str, headers: &HeaderMap) -> bool {
    is_streaming_target(target) || is_streaming_request(headers)
}
