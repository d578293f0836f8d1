//! Injected HTTP capability used by the reporter.
//!
//! The engine never does connection management or retries itself; it hands a
//! fully-built request to an [`HttpClient`] and interprets the status code.

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};

use crate::error::BoxError;

/// An outgoing request. The body is borrowed from the reporter's pooled buffer.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: HeaderMap,
    pub body: &'a [u8],
}

/// A response whose body has been read to completion.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `request`; connection and body-read failures are returned as `Err`.
    async fn send(&self, request: HttpRequest<'_>) -> Result<HttpResponse, BoxError>;
}

// ─── reqwest-backed client ───────────────────────────────────────

/// Production client. `reqwest::Client` is cheaply cloneable and pools
/// connections internally.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest<'_>) -> Result<HttpResponse, BoxError> {
        let resp = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body.to_vec())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
