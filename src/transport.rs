//! The transport primitive named as an external collaborator in spec.md §1:
//! given a URL, request options, and a body, it performs the exchange and
//! returns response headers plus a byte stream. Pluggable so tests can
//! supply a [`MockTransport`]-style stand-in (spec.md §9 "Callback-driven
//! transport") — here rendered as an explicit async request/response pair
//! rather than the two-phase callback style of the original, since Rust's
//! `async fn` in a trait already gives the same "send body, then await
//! headers" ordering without needing a callback object.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;

/// A transport-level request, already fully assembled by the executor
/// (headers built, body formatted). The transport only needs to move bytes.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: String,
    pub url: url::Url,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

/// Raw response headers and a byte stream, before any decompression or
/// materialization (spec.md §4.2 "Response materialization" is layered on
/// top of this by the executor).
pub struct TransportResponse {
    pub status: u16,
    pub status_message: String,
    pub headers: HashMap<String, Vec<String>>,
    pub body: BoxStream<'static, std::result::Result<Bytes, std::io::Error>>,
}

/// The pluggable transport collaborator. `reqwest`-backed in production
/// ([`ReqwestTransport`]); an in-memory fake in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> std::io::Result<TransportResponse>;
}

/// Default production transport, backed by a shared `reqwest::Client` (the
/// session's connection pool — spec.md §3 "agent/connection-pool options",
/// §5 "Shared resources").
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Build a `reqwest::Client` with automatic redirect-following disabled.
/// The executor's own [`crate::http`] redirect loop is what walks 3xx
/// hops (re-selecting cookies and reapplying Referer/Origin per hop); a
/// `reqwest::Client` built with its default redirect policy would follow
/// them transparently first and the executor would never see the
/// intermediate responses at all. Every production-default client in this
/// crate (the standalone `http_request` entry point, and `HttpSession`
/// when no `client` override is configured) must be built this way.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client with a no-op TLS/DNS configuration must build")
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> std::io::Result<TransportResponse> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
        use std::str::FromStr;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let mut header_map = HeaderMap::new();
        for (name, values) in &request.headers {
            let Ok(header_name) = HeaderName::from_str(name) else {
                continue;
            };
            for value in values {
                if let Ok(header_value) = HeaderValue::from_str(value) {
                    header_map.append(header_name.clone(), header_value);
                }
            }
        }

        let mut builder = self
            .client
            .request(method, request.url)
            .headers(header_map)
            .body(request.body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let status = response.status().as_u16();
        let status_message = response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();

        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_default()
                    .push(value.to_string());
            }
        }

        let body = futures::StreamExt::map(response.bytes_stream(), |chunk| {
            chunk.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });

        Ok(TransportResponse {
            status,
            status_message,
            headers,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_builds() {
        let _ = default_client();
    }
}
