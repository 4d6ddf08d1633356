use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body `{ "error": message }` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Transport-level errors mapped to HTTP statuses.
pub enum HttpError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            HttpError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::Internal(msg) => {
                // the detail is for the log, not the client
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        error_response(status, message)
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            HttpError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            HttpError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            HttpError::NotFound(msg) => write!(f, "not found: {msg}"),
            HttpError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::fmt::Debug for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

/// Application-level error carried through handlers: an error kind tag, an
/// optional field or resource name, and a human message.
///
/// Serializes to the `{error, data, message}` shape the API emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(
        error: impl Into<String>,
        data: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    /// Input value missing or failing validation.
    pub fn value_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    /// Referenced entity does not exist.
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:notfound", field, message)
    }

    /// Caller lacks the required privilege.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.error, self.message, self.data)
    }
}

impl std::error::Error for ApiError {}

/// What a handler can fail with.
///
/// `Api` errors are part of the API contract: the binder catches them and
/// turns them into a structured error reply. `Http` errors propagate to the
/// transport layer as status responses.
#[derive(Debug)]
pub enum HandlerError {
    Api(ApiError),
    Http(HttpError),
}

impl From<ApiError> for HandlerError {
    fn from(err: ApiError) -> Self {
        HandlerError::Api(err)
    }
}

impl From<HttpError> for HandlerError {
    fn from(err: HttpError) -> Self {
        HandlerError::Http(err)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Api(err) => write!(f, "{err}"),
            HandlerError::Http(err) => write!(f, "{err}"),
        }
    }
}
