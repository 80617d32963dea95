//! reqwest-backed upstream transport.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header::HOST, HeaderMap};
use reqwest::{redirect, Client};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::resilience::timeouts::with_response_deadline;
use crate::upstream::{Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};

/// HTTP client used for every forwarding attempt.
///
/// reqwest keeps no response cache and, without its compression features,
/// relays compressed bodies as-is alongside their `Content-Encoding`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    response_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .redirect(redirect::Policy::limited(upstream.max_redirects));

        if !upstream.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            response_timeout: Duration::from_secs(timeouts.response_secs),
        })
    }
}

/// reqwest keeps an explicit Host across redirects, so it is dropped here and
/// derived from each hop's URL instead. On the first hop that is the target.
fn transport_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.remove(HOST);
    headers
}

impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(transport_headers(request.headers));
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = with_response_deadline(self.response_timeout, builder.send()).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = Body::from_stream(response.bytes_stream());

        Ok(UpstreamResponse { status, headers, body })
    }
}
