//! Request dispatch against a Syncthing instance.
//!
//! Every request funnels through [`Connection::run_request`]; authentication,
//! transport and error classification are wired in only there.

use crate::api_info::ApiInfo;
use crate::auth::{Authenticator, CredentialStore, Credentials, InMemoryCredentialStore};
use crate::errors::{SyncthingError, SyncthingResult};
use crate::http::{Body, HttpTransport, Request, Response};
use crate::pipeline::{JsonPipeline, JSON_MEDIA_TYPE};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// A typed API response: the deserialized body plus the original HTTP
/// response and its parsed metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    body: Option<T>,
    response: Response,
    api_info: ApiInfo,
}

impl<T> ApiResponse<T> {
    pub(crate) fn new(body: Option<T>, response: Response, api_info: ApiInfo) -> Self {
        Self {
            body,
            response,
            api_info,
        }
    }

    /// Gets the typed body, when the response carried one.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Consumes the response and returns the typed body.
    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// Gets the original HTTP response.
    pub fn http_response(&self) -> &Response {
        &self.response
    }

    /// Gets the metadata parsed from the response headers.
    pub fn api_info(&self) -> &ApiInfo {
        &self.api_info
    }

    /// Gets the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }
}

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    params: Vec<(String, String)>,
    accepts: Option<String>,
    content_type: Option<String>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Overrides the accepted response media type.
    pub fn accepts(mut self, accepts: impl Into<String>) -> Self {
        self.accepts = Some(accepts.into());
        self
    }

    /// Overrides the request body media type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Bounds the transport stage with an explicit timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Threads a cancellation token through the call.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// A connection for making HTTP requests against a Syncthing instance.
pub struct Connection {
    base_address: Url,
    authenticator: Authenticator,
    pipeline: JsonPipeline,
    transport: Arc<dyn HttpTransport>,
}

impl Connection {
    /// Creates a new anonymous connection.
    pub fn new(base_address: Url, transport: Arc<dyn HttpTransport>) -> SyncthingResult<Self> {
        Self::with_credential_store(
            base_address,
            Arc::new(InMemoryCredentialStore::new(Credentials::anonymous())),
            transport,
        )
    }

    /// Creates a new connection with the given credential store.
    pub fn with_credential_store(
        mut base_address: Url,
        credential_store: Arc<dyn CredentialStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> SyncthingResult<Self> {
        if base_address.scheme() != "http" && base_address.scheme() != "https" {
            return Err(SyncthingError::configuration(format!(
                "the base address '{}' must use http or https",
                base_address
            )));
        }
        // Relative endpoints resolve against the full base path only when it
        // ends with a slash.
        if !base_address.path().ends_with('/') {
            let path = format!("{}/", base_address.path());
            base_address.set_path(&path);
        }

        Ok(Self {
            base_address,
            authenticator: Authenticator::new(credential_store),
            pipeline: JsonPipeline::new(),
            transport,
        })
    }

    /// Gets the base address for the connection.
    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    /// Gets the credential store used to provide credentials for the
    /// connection.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.authenticator.credential_store()
    }

    /// Gets the current credentials, treating an empty store as anonymous.
    pub async fn credentials(&self) -> SyncthingResult<Credentials> {
        Ok(self
            .credential_store()
            .get_credentials()
            .await?
            .unwrap_or_else(Credentials::anonymous))
    }

    /// Replaces the credential store with a fixed single-value store.
    ///
    /// Convenience for callers with one hard-coded credential; in-flight
    /// requests may observe either the old or the new value.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.authenticator
            .set_credential_store(Arc::new(InMemoryCredentialStore::new(credentials)));
    }

    // Per-verb entry points. Thin builders; all return through `send`.

    /// Performs a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncthingResult<ApiResponse<T>> {
        self.get_with(path, RequestOptions::new()).await
    }

    /// Performs a GET request with explicit options.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> SyncthingResult<ApiResponse<T>> {
        self.send(Method::GET, path, None, options).await
    }

    /// Performs a POST request with a typed body.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncthingResult<ApiResponse<T>> {
        self.send(Method::POST, path, Some(json_body(body)?), RequestOptions::new())
            .await
    }

    /// Performs a POST request with explicit options and an optional body.
    pub async fn post_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> SyncthingResult<ApiResponse<T>> {
        let body = body.map(json_body).transpose()?;
        self.send(Method::POST, path, body, options).await
    }

    /// Performs a POST request, returning only the status code.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> = self
            .send(Method::POST, path, Some(json_body(body)?), RequestOptions::new())
            .await?;
        Ok(response.status())
    }

    /// Performs a PUT request with a typed body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncthingResult<ApiResponse<T>> {
        self.send(Method::PUT, path, Some(json_body(body)?), RequestOptions::new())
            .await
    }

    /// Performs a PUT request with explicit options and an optional body.
    pub async fn put_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> SyncthingResult<ApiResponse<T>> {
        let body = body.map(json_body).transpose()?;
        self.send(Method::PUT, path, body, options).await
    }

    /// Performs a bodyless PUT request, returning only the status code.
    pub async fn put_unit(&self, path: &str) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> = self
            .send(Method::PUT, path, None, RequestOptions::new())
            .await?;
        Ok(response.status())
    }

    /// Performs a PATCH request with a typed body.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncthingResult<ApiResponse<T>> {
        self.send(Method::PATCH, path, Some(json_body(body)?), RequestOptions::new())
            .await
    }

    /// Performs a PATCH request with explicit options and an optional body.
    pub async fn patch_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> SyncthingResult<ApiResponse<T>> {
        let body = body.map(json_body).transpose()?;
        self.send(Method::PATCH, path, body, options).await
    }

    /// Performs a bodyless PATCH request, returning only the status code.
    pub async fn patch_unit(&self, path: &str) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> = self
            .send(Method::PATCH, path, None, RequestOptions::new())
            .await?;
        Ok(response.status())
    }

    /// Performs a DELETE request, returning only the status code.
    pub async fn delete(&self, path: &str) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> = self
            .send(Method::DELETE, path, None, RequestOptions::new())
            .await?;
        Ok(response.status())
    }

    /// Performs a DELETE request with explicit options, returning only the
    /// status code.
    pub async fn delete_with(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> =
            self.send(Method::DELETE, path, None, options).await?;
        Ok(response.status())
    }

    /// Performs a DELETE request with a typed body, returning only the
    /// status code.
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncthingResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> = self
            .send(Method::DELETE, path, Some(json_body(body)?), RequestOptions::new())
            .await?;
        Ok(response.status())
    }

    /// Performs a request with full control over method, body and options.
    ///
    /// Raw [`Body::Text`] and [`Body::Bytes`] payloads pass through the JSON
    /// pipeline untouched.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        options: RequestOptions,
    ) -> SyncthingResult<ApiResponse<T>> {
        if path.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the endpoint path must not be empty",
            ));
        }
        if let Some(timeout) = options.timeout {
            if timeout.is_zero() {
                return Err(SyncthingError::invalid_argument(
                    "the timeout must be greater than zero",
                ));
            }
        }

        let endpoint = apply_parameters(path, &options.params)?;
        let mut request = Request::new(method, self.base_address.clone(), endpoint);

        if let Some(ref accepts) = options.accepts {
            let value = HeaderValue::from_str(accepts).map_err(|_| {
                SyncthingError::invalid_argument("the accepts value is not a valid header value")
            })?;
            request.headers.insert(ACCEPT, value);
        }

        if body.is_some() {
            request.content_type = Some(
                options
                    .content_type
                    .clone()
                    .unwrap_or_else(|| JSON_MEDIA_TYPE.to_string()),
            );
        }
        request.body = body;
        request.timeout = options.timeout;

        self.run(request, options.cancel.unwrap_or_default()).await
    }

    async fn run<T: DeserializeOwned>(
        &self,
        mut request: Request,
        cancel: CancellationToken,
    ) -> SyncthingResult<ApiResponse<T>> {
        self.pipeline.serialize_request(&mut request)?;
        let response = self.run_request(request, cancel).await?;
        self.pipeline.deserialize_response(response)
    }

    // THIS IS THE METHOD THAT EVERY REQUEST MUST GO THROUGH!
    async fn run_request(
        &self,
        mut request: Request,
        cancel: CancellationToken,
    ) -> SyncthingResult<Response> {
        debug!(method = %request.method, endpoint = %request.endpoint, "dispatching request");

        self.authenticator.apply(&mut request).await?;
        let response = self.transport.send(request, cancel).await?;
        handle_errors(&response)?;
        Ok(response)
    }
}

fn handle_errors(response: &Response) -> SyncthingResult<()> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(());
    }

    warn!(status, "request failed");
    Err(SyncthingError::from_response(status, response.body()))
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> SyncthingResult<Body> {
    serde_json::to_value(body)
        .map(Body::Json)
        .map_err(|e| {
            SyncthingError::serialization(format!("failed to serialize request body: {}", e))
        })
}

/// Merges query parameters into an endpoint path. A parameter whose key is
/// already present in the path replaces the existing value instead of
/// duplicating the key.
fn apply_parameters(path: &str, params: &[(String, String)]) -> SyncthingResult<String> {
    if params.is_empty() {
        return Ok(path.to_string());
    }

    let (base, query) = match path.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (path, None),
    };

    let mut pairs: Vec<(String, String)> = match query {
        Some(query) => serde_urlencoded::from_str(query).map_err(|e| {
            SyncthingError::invalid_argument(format!("invalid query string '{}': {}", query, e))
        })?,
        None => Vec::new(),
    };

    for (key, value) in params {
        match pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some(pair) => pair.1 = value.clone(),
            None => pairs.push((key.clone(), value.clone())),
        }
    }

    let encoded = serde_urlencoded::to_string(&pairs).map_err(|e| {
        SyncthingError::invalid_argument(format!("failed to encode query parameters: {}", e))
    })?;

    Ok(format!("{}?{}", base, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncthingErrorKind;
    use crate::mocks::{MockResponse, MockTransport};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    struct Item {
        id: String,
    }

    fn connection(transport: MockTransport) -> Connection {
        Connection::new(
            Url::parse("https://localhost:8384/").unwrap(),
            Arc::new(transport),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_parameters_merges_without_duplicates() {
        let params = vec![
            ("page".to_string(), "2".to_string()),
            ("limit".to_string(), "10".to_string()),
        ];
        let endpoint = apply_parameters("rest/config/folders?page=1", &params).unwrap();
        assert_eq!(endpoint, "rest/config/folders?page=2&limit=10");
    }

    #[test]
    fn test_apply_parameters_no_params_is_identity() {
        assert_eq!(
            apply_parameters("rest/config", &[]).unwrap(),
            "rest/config"
        );
    }

    #[test]
    fn test_base_address_gains_trailing_slash() {
        let connection = Connection::new(
            Url::parse("https://localhost:8384/syncthing").unwrap(),
            Arc::new(MockTransport::new()),
        )
        .unwrap();
        assert_eq!(connection.base_address().path(), "/syncthing/");
    }

    #[test]
    fn test_non_http_base_address_rejected() {
        let result = Connection::new(
            Url::parse("ftp://localhost:8384/").unwrap(),
            Arc::new(MockTransport::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_path_fails_before_transport() {
        let transport = MockTransport::new();
        let connection = connection(transport.clone());

        let error = connection.get::<Item>("").await.unwrap_err();
        assert_eq!(*error.kind(), SyncthingErrorKind::InvalidArgument);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_zero_timeout_fails_before_transport() {
        let transport = MockTransport::new();
        let connection = connection(transport.clone());

        let error = connection
            .get_with::<Item>(
                "rest/config",
                RequestOptions::new().timeout(Duration::ZERO),
            )
            .await
            .unwrap_err();
        assert_eq!(*error.kind(), SyncthingErrorKind::InvalidArgument);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_deserializes_typed_body() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::ok(&Item { id: "a".into() }),
        );

        let response = connection(transport)
            .get::<Item>("rest/config")
            .await
            .unwrap();
        assert_eq!(response.into_body().unwrap(), Item { id: "a".into() });
    }

    #[tokio::test]
    async fn test_accept_header_defaults_to_json() {
        let transport = MockTransport::new();
        transport.enqueue("GET", "rest/config", MockResponse::no_content());

        connection(transport.clone())
            .get::<serde_json::Value>("rest/config")
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[0].headers.get(ACCEPT).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_accepts_override() {
        let transport = MockTransport::new();
        transport.enqueue("GET", "rest/config", MockResponse::no_content());

        connection(transport.clone())
            .get_with::<serde_json::Value>(
                "rest/config",
                RequestOptions::new().accepts("text/plain"),
            )
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].headers.get(ACCEPT).unwrap(),
            "text/plain"
        );
    }

    #[tokio::test]
    async fn test_post_defaults_content_type() {
        let transport = MockTransport::new();
        transport.enqueue("POST", "rest/config/folders", MockResponse::no_content());

        connection(transport.clone())
            .post_unit("rest/config/folders", &Item { id: "a".into() })
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
        match requests[0].body {
            Some(Body::Text(ref text)) => assert_eq!(text, r#"{"id":"a"}"#),
            ref other => panic!("expected serialized body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_statuses_classified() {
        let cases: &[(u16, SyncthingErrorKind)] = &[
            (401, SyncthingErrorKind::Unauthorized),
            (404, SyncthingErrorKind::NotFound),
            (500, SyncthingErrorKind::Api),
        ];

        for (status, kind) in cases {
            let transport = MockTransport::new();
            transport.enqueue("GET", "rest/config", MockResponse::status(*status, ""));

            let error = connection(transport)
                .get::<Item>("rest/config")
                .await
                .unwrap_err();
            assert_eq!(error.kind(), kind, "status {}", status);
            assert_eq!(error.status_code(), Some(*status));
        }
    }

    #[tokio::test]
    async fn test_forbidden_lockout_body() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::status(403, "number of login attempts exceeded"),
        );

        let error = connection(transport)
            .get::<Item>("rest/config")
            .await
            .unwrap_err();
        assert_eq!(*error.kind(), SyncthingErrorKind::LoginAttemptsExceeded);
    }

    #[tokio::test]
    async fn test_success_status_is_not_an_error() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::ok(&Item { id: "ok".into() }),
        );

        let response = connection(transport).get::<Item>("rest/config").await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_before_classification() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::status(500, "never classified")
                .with_delay(Duration::from_secs(5)),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = connection(transport)
            .get_with::<Item>("rest/config", RequestOptions::new().cancellation(cancel))
            .await
            .unwrap_err();
        assert_eq!(*error.kind(), SyncthingErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_put_with_applies_parameters() {
        let transport = MockTransport::new();
        transport.enqueue("PUT", "rest/config/folders/x", MockResponse::no_content());

        connection(transport.clone())
            .put_with::<serde_json::Value, Item>(
                "rest/config/folders/x",
                Some(&Item { id: "a".into() }),
                RequestOptions::new().param("page", "2"),
            )
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].endpoint,
            "rest/config/folders/x?page=2"
        );
    }

    #[tokio::test]
    async fn test_patch_with_timeout_reaches_transport() {
        let transport = MockTransport::new();
        transport.enqueue("PATCH", "rest/config", MockResponse::no_content());

        connection(transport.clone())
            .patch_with::<serde_json::Value, Item>(
                "rest/config",
                None,
                RequestOptions::new().timeout(Duration::from_secs(3)),
            )
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].timeout,
            Some(Duration::from_secs(3))
        );
    }

    #[tokio::test]
    async fn test_delete_with_cancellation() {
        let transport = MockTransport::new();
        transport.enqueue(
            "DELETE",
            "rest/config/folders/x",
            MockResponse::no_content().with_delay(Duration::from_secs(5)),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = connection(transport)
            .delete_with(
                "rest/config/folders/x",
                RequestOptions::new().cancellation(cancel),
            )
            .await
            .unwrap_err();
        assert_eq!(*error.kind(), SyncthingErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_set_credentials_replaces_store() {
        let transport = MockTransport::new();
        transport.enqueue("GET", "rest/config", MockResponse::no_content());

        let connection = connection(transport.clone());
        connection.set_credentials(Credentials::api_key("abc123").unwrap());

        connection
            .get::<serde_json::Value>("rest/config")
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].headers.get("x-api-key").unwrap(),
            "abc123"
        );
    }

    #[tokio::test]
    async fn test_api_info_exposed_on_response() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::ok(&Item { id: "a".into() })
                .with_header("Link", "<http://x/2>; rel=\"next\""),
        );

        let response = connection(transport)
            .get::<Item>("rest/config")
            .await
            .unwrap();
        assert_eq!(
            response.api_info().links().get("next").unwrap(),
            "http://x/2"
        );
    }
}
