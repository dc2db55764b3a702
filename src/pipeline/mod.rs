//! JSON serialization pipeline applied to every request and response.

use crate::api_info::ApiInfo;
use crate::connection::ApiResponse;
use crate::errors::{SyncthingError, SyncthingResult};
use crate::http::{Body, Request, Response};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use serde::de::DeserializeOwned;

/// Media type for JSON request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Serializes request bodies to JSON and maps response bodies to typed
/// results.
#[derive(Debug, Default)]
pub struct JsonPipeline;

impl JsonPipeline {
    /// Creates a new pipeline.
    pub fn new() -> Self {
        Self
    }

    /// Prepares a request for sending.
    ///
    /// Defaults the `Accept` header to JSON when the caller set none. GET
    /// requests and absent bodies are left alone, as are raw text and byte
    /// bodies whose encoding the caller controls. Typed bodies are
    /// serialized to JSON text.
    pub fn serialize_request(&self, request: &mut Request) -> SyncthingResult<()> {
        if !request.headers.contains_key(ACCEPT) {
            request
                .headers
                .insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        }

        if request.method == Method::GET {
            return Ok(());
        }

        match request.body.take() {
            None => {}
            Some(raw @ (Body::Text(_) | Body::Bytes(_))) => {
                request.body = Some(raw);
            }
            Some(Body::Json(value)) => {
                let text = serde_json::to_string(&value).map_err(|e| {
                    SyncthingError::serialization(format!(
                        "failed to serialize request body: {}",
                        e
                    ))
                })?;
                request.body = Some(Body::Text(text));
            }
        }

        Ok(())
    }

    /// Maps a response body to a typed result.
    ///
    /// Produces an empty typed result unless the response is JSON with a
    /// non-empty body that is not the literal `{}`.
    pub fn deserialize_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> SyncthingResult<ApiResponse<T>> {
        let api_info = ApiInfo::from_headers(response.headers());

        let body = response.body();
        let typed = if response.content_type() == Some(JSON_MEDIA_TYPE)
            && !body.is_empty()
            && body != "{}"
        {
            Some(parse_body::<T>(body)?)
        } else {
            None
        };

        Ok(ApiResponse::new(typed, response, api_info))
    }
}

// Some endpoints return either a single object or an array depending on the
// query shape. When the target expects a sequence and the body is a single
// object, wrap it in an array and retry; map and object targets succeed on
// the first parse and are never wrapped.
fn parse_body<T: DeserializeOwned>(body: &str) -> SyncthingResult<T> {
    let first_error = match serde_json::from_str::<T>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if body.trim_start().starts_with('{') {
        let wrapped = format!("[{}]", body);
        if let Ok(value) = serde_json::from_str::<T>(&wrapped) {
            return Ok(value);
        }
    }

    Err(SyncthingError::serialization(format!(
        "failed to deserialize response into {}: {}",
        std::any::type_name::<T>(),
        first_error
    ))
    .with_body(body))
}
