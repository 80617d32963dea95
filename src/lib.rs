//! Live-stream relay library.
//!
//! A stateless reverse proxy for HLS, FLV, DASH and MP4 URLs: the inbound
//! path names the upstream URL, the request is forwarded with a media-player
//! identity, transient failures are retried with backoff, and the response
//! is relayed uncached with permissive CORS.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
