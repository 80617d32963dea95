//! Configuration page served when the path carries no target.
//!
//! The page's script must build proxy links the dispatcher can decode:
//! `https://<hostname>/<encodeURIComponent(url)>`.

use axum::{
    http::{header::HOST, HeaderMap, Uri},
    response::{Html, IntoResponse, Response},
};
use url::Url;

const FALLBACK_HOSTNAME: &str = "localhost";

/// Hostname the client used to reach the relay, without port.
pub fn request_hostname(headers: &HeaderMap, uri: &Uri) -> String {
    let authority = uri
        .host()
        .map(str::to_string)
        .or_else(|| headers.get(HOST).and_then(|v| v.to_str().ok()).map(str::to_string));

    authority
        .and_then(|host| Url::parse(&format!("http://{host}")).ok())
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string())
}

pub fn config_page(hostname: &str) -> Response {
    Html(render(hostname)).into_response()
}

fn render(hostname: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Live Stream Relay</title>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 640px; margin: 48px auto; padding: 0 16px; }}
    input {{ width: 100%; padding: 10px; box-sizing: border-box; }}
    button {{ margin-top: 12px; padding: 10px 20px; }}
    code {{ word-break: break-all; }}
  </style>
</head>
<body>
  <h1>Live Stream Relay</h1>
  <p>Paste an HLS, FLV, DASH or MP4 URL to get a relayed link.</p>
  <input id="url" type="text" placeholder="https://example.com/live/index.m3u8">
  <button onclick="createProxy()">Create link</button>
  <p id="result"></p>
  <script>
    const HOSTNAME = "{hostname}";
    function normalizeUrl(url) {{
      if (!/^https?:\/\//i.test(url) && !/^rtmps?:\/\//i.test(url)) {{
        return 'https://' + url;
      }}
      return url;
    }}
    function createProxy() {{
      const input = document.getElementById('url');
      const value = input.value.trim();
      if (!value) return;
      const proxyUrl = `https://${{HOSTNAME}}/${{encodeURIComponent(normalizeUrl(value))}}`;
      const result = document.getElementById('result');
      result.textContent = '';
      const code = document.createElement('code');
      code.textContent = proxyUrl;
      result.appendChild(code);
      if (navigator.clipboard) navigator.clipboard.writeText(proxyUrl);
      input.value = '';
    }}
    document.getElementById('url').addEventListener('keypress', e => {{
      if (e.key === 'Enter') createProxy();
    }});
  </script>
</body>
</html>
"#
    )
}
