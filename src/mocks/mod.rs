//! Mock transport for testing without a Syncthing instance.

use crate::errors::{SyncthingError, SyncthingErrorKind, SyncthingResult};
use crate::http::{HttpTransport, Request, Response};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A canned response served by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Delay before responding.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Creates a response with the given status and raw body, no content
    /// type attached.
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: HashMap::new(),
            delay: None,
        }
    }

    /// Creates a 200 JSON response with the given body.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::status(200, &serde_json::to_string(body).unwrap_or_default())
            .with_header("content-type", "application/json")
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::status(204, "")
    }

    /// Creates a 401 Unauthorized response.
    pub fn unauthorized() -> Self {
        Self::status(401, "Not Authorized")
    }

    /// Creates a 403 Forbidden response with the given body.
    pub fn forbidden(body: &str) -> Self {
        Self::status(403, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::status(404, "404 page not found")
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: &str) -> Self {
        Self::status(500, body)
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Adds a delay before responding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_response(self) -> SyncthingResult<Response> {
        let status = StatusCode::from_u16(self.status).map_err(|_| {
            SyncthingError::new(
                SyncthingErrorKind::Transport,
                format!("mock response has invalid status {}", self.status),
            )
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                SyncthingError::new(
                    SyncthingErrorKind::Transport,
                    format!("mock response has invalid header name '{}'", name),
                )
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                SyncthingError::new(
                    SyncthingErrorKind::Transport,
                    "mock response has an invalid header value",
                )
            })?;
            headers.insert(name, value);
        }

        Ok(Response::new(status, headers, self.body))
    }
}

/// In-memory transport serving queued responses and recording every request
/// it receives.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,
    requests: Arc<RwLock<Vec<Request>>>,
}

impl MockTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the given method and path. Responses queued for
    /// the same method and path are served in order.
    pub fn enqueue(&self, method: &str, path: &str, response: MockResponse) {
        let mut responses = self
            .responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        responses
            .entry(Self::key(method, path))
            .or_default()
            .push_back(response);
    }

    /// Gets the requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn key(method: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let path = path.split('?').next().unwrap_or(path);
        format!("{} {}", method.to_uppercase(), path)
    }

    fn dequeue(&self, request: &Request) -> Option<MockResponse> {
        let mut responses = self
            .responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        responses
            .get_mut(&Self::key(request.method.as_str(), &request.endpoint))
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: Request, cancel: CancellationToken) -> SyncthingResult<Response> {
        self.requests
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let response = self.dequeue(&request).ok_or_else(|| {
            SyncthingError::new(
                SyncthingErrorKind::Transport,
                format!(
                    "no mock response queued for {} {}",
                    request.method, request.endpoint
                ),
            )
        })?;

        if let Some(delay) = response.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SyncthingError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(SyncthingError::cancelled());
        }

        response.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn request(method: Method, endpoint: &str) -> Request {
        Request::new(
            method,
            Url::parse("https://localhost:8384/").unwrap(),
            endpoint,
        )
    }

    #[tokio::test]
    async fn test_serves_queued_responses_in_order() {
        let transport = MockTransport::new();
        transport.enqueue("GET", "rest/config", MockResponse::status(200, "first"));
        transport.enqueue("GET", "rest/config", MockResponse::status(200, "second"));

        let cancel = CancellationToken::new();
        let first = transport
            .send(request(Method::GET, "rest/config"), cancel.clone())
            .await
            .unwrap();
        let second = transport
            .send(request(Method::GET, "rest/config"), cancel)
            .await
            .unwrap();

        assert_eq!(first.body(), "first");
        assert_eq!(second.body(), "second");
    }

    #[tokio::test]
    async fn test_matching_ignores_query_string() {
        let transport = MockTransport::new();
        transport.enqueue("GET", "rest/config", MockResponse::no_content());

        let response = transport
            .send(
                request(Method::GET, "rest/config?page=2"),
                CancellationToken::new(),
            )
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_unqueued_request_fails() {
        let transport = MockTransport::new();
        let result = transport
            .send(request(Method::GET, "rest/unknown"), CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_records_requests() {
        let transport = MockTransport::new();
        transport.enqueue("DELETE", "rest/config/folders/x", MockResponse::no_content());

        transport
            .send(
                request(Method::DELETE, "rest/config/folders/x"),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::DELETE);
    }
}
