//! Request plumbing shared by the management and directory clients.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tagger_core::{ApiError, ApiResult};

use crate::auth::Authorizer;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Graph 1.6 error envelope: `{"odata.error": {"message": {"value": "..."}}}`.
#[derive(Debug, Deserialize)]
struct ODataErrorResponse {
    #[serde(rename = "odata.error")]
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    message: ODataMessage,
}

#[derive(Debug, Deserialize)]
struct ODataMessage {
    value: String,
}

/// Adds a bearer token from `authorizer`. A failed token acquisition is
/// reported as [`ApiError::Unauthorized`].
pub(crate) async fn authorized(
    request: reqwest::RequestBuilder,
    authorizer: &dyn Authorizer,
) -> ApiResult<reqwest::RequestBuilder> {
    let token = authorizer
        .token()
        .await
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    Ok(request.bearer_auth(token.token))
}

pub(crate) async fn send(request: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let body = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn transport_error(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

/// Maps a non-success response to an [`ApiError`], preferring the
/// platform's error message over the raw body.
pub(crate) fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    if let Ok(response) = serde_json::from_str::<ErrorResponse>(body) {
        return match response.error.code {
            Some(code) => format!("{code}: {}", response.error.message),
            None => response.error.message,
        };
    }
    if let Ok(response) = serde_json::from_str::<ODataErrorResponse>(body) {
        return response.error.message.value;
    }
    body.to_string()
}
