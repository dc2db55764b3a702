//! HTTP primitives and the pluggable transport.

use crate::errors::{SyncthingError, SyncthingErrorKind, SyncthingResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Request body payload.
///
/// Raw variants pass through the JSON pipeline untouched; the encoding is
/// then entirely caller-controlled.
#[derive(Debug, Clone)]
pub enum Body {
    /// Raw text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// Typed payload awaiting JSON serialization.
    Json(serde_json::Value),
}

/// An outgoing HTTP request.
///
/// Built per call and discarded once the response is produced.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Base address of the Syncthing instance.
    pub base_address: Url,
    /// Endpoint path relative to the base address, query string included.
    pub endpoint: String,
    /// Request headers. Lookup is case-insensitive and keys are unique.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Body>,
    /// Media type of the request body.
    pub content_type: Option<String>,
    /// Optional timeout bounding only the transport stage.
    pub timeout: Option<Duration>,
}

impl Request {
    /// Creates a new request for the given method and endpoint.
    pub fn new(method: Method, base_address: Url, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            base_address,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            body: None,
            content_type: None,
            timeout: None,
        }
    }

    /// Resolves the full request URL.
    pub fn url(&self) -> SyncthingResult<Url> {
        self.base_address
            .join(self.endpoint.trim_start_matches('/'))
            .map_err(|e| {
                SyncthingError::invalid_argument(format!(
                    "invalid endpoint '{}': {}",
                    self.endpoint, e
                ))
            })
    }
}

/// An HTTP response as produced by the transport.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Response {
    /// Creates a new response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Gets the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Gets the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the raw response body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Gets the response media type, with any parameters stripped.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }
}

/// Pluggable transport used by the connection to perform network I/O.
///
/// Implementations must not fail on non-2xx statuses; interpreting the status
/// code is the connection's responsibility.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request, honoring its timeout and the cancellation token.
    async fn send(&self, request: Request, cancel: CancellationToken) -> SyncthingResult<Response>;
}

/// Default transport backed by [`reqwest`].
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport from a prepared [`reqwest::Client`].
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: Request, cancel: CancellationToken) -> SyncthingResult<Response> {
        let url = request.url()?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if let Some(ref content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        builder = match request.body {
            Some(Body::Text(text)) => builder.body(text),
            Some(Body::Bytes(bytes)) => builder.body(bytes),
            Some(Body::Json(value)) => {
                let text = serde_json::to_string(&value).map_err(|e| {
                    SyncthingError::serialization(format!(
                        "failed to serialize request body: {}",
                        e
                    ))
                })?;
                builder.body(text)
            }
            None => builder,
        };

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncthingError::cancelled()),
            result = builder.send() => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        let headers = response.headers().clone();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncthingError::cancelled()),
            result = response.text() => result.map_err(map_reqwest_error)?,
        };

        Ok(Response::new(status, headers, body))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> SyncthingError {
    if e.is_timeout() {
        SyncthingError::timeout(format!("request timed out: {}", e)).with_cause(e)
    } else if e.is_connect() {
        SyncthingError::new(
            SyncthingErrorKind::ConnectionFailed,
            format!("connection failed: {}", e),
        )
        .with_cause(e)
    } else {
        SyncthingError::new(
            SyncthingErrorKind::Transport,
            format!("request failed: {}", e),
        )
        .with_cause(e)
    }
}
