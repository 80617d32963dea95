//! Target URL extraction.
//!
//! The inbound path carries the upstream URL: everything after the leading
//! `/`, percent-decoded. `https://relay.example/https%3A%2F%2Fcdn%2Fa.m3u8`
//! targets `https://cdn/a.m3u8`.

use std::fmt;
use std::string::FromUtf8Error;

use thiserror::Error;
use url::Url;

/// Reasons a target cannot be forwarded to.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("target is not valid percent-encoded UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),

    #[error("target is not an absolute URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("target URL has no host")]
    MissingHost,

    #[error("scheme {0:?} cannot be fetched over HTTP")]
    UnsupportedScheme(String),
}

/// A validated absolute upstream URL.
#[derive(Debug, Clone)]
pub struct TargetUrl {
    raw: String,
    url: Url,
}

impl TargetUrl {
    /// Validate a decoded target. Only http and https targets can be fetched.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TargetError> {
        let raw = raw.into();
        let url = Url::parse(&raw)?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(TargetError::MissingHost);
        }
        match url.scheme() {
            "http" | "https" => Ok(Self { raw, url }),
            other => Err(TargetError::UnsupportedScheme(other.to_string())),
        }
    }

    /// The target exactly as the client supplied it (after decoding).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Value for the outbound `Host` header: host plus any non-default port.
    pub fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Decode the target from a request path. `Ok(None)` means no target was
/// given and the configuration page should be served.
pub fn extract_target(path: &str) -> Result<Option<String>, TargetError> {
    let encoded = path.strip_prefix('/').unwrap_or(path);
    if encoded.is_empty() {
        return Ok(None);
    }
    let decoded = urlencoding::decode(encoded)?;
    if decoded.is_empty() {
        return Ok(None);
    }
    Ok(Some(decoded.into_owned()))
}
