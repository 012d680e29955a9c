//! Transport seam: perform one HTTP exchange, stream the body into a sink.
//!
//! This is the ONLY place that touches reqwest. client/mod.rs builds
//! requests and interprets outcomes but never talks to the network itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, LOCATION};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::buffer::ResponseBuffer;
use crate::error::{AttestError, AttestResult, Step};

/// A fully built protocol request.
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    pub step: Step,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: &'a [u8],
}

/// Status line and headers of a completed exchange.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Case-insensitive header lookup; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Non-blank `Location` header value.
    pub fn location(&self) -> Option<&str> {
        self.header(&LOCATION).filter(|v| !v.trim().is_empty())
    }
}

/// "Perform request, get status + headers + body" capability.
///
/// Implementations deliver body chunks to `sink` in order and must stop the
/// exchange as soon as `sink` refuses a chunk.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(
        &self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> AttestResult<ResponseHead>;
}

/// reqwest-backed transport; one connection pool per instance, released on drop.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AttestResult<Self> {
        // Redirects stay off: a 3xx Location is a session location, not a hop.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AttestError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(
        &self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> AttestResult<ResponseHead> {
        let mut response = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .body(request.body.to_vec())
            .send()
            .await?;

        let head = ResponseHead {
            status: response.status(),
            headers: response.headers().clone(),
        };
        debug!(step = %request.step, status = head.status.as_u16(), "response head received");

        // Dropping `response` on an early return aborts the exchange.
        while let Some(chunk) = response.chunk().await? {
            sink.append(&chunk)?;
        }

        Ok(head)
    }
}
