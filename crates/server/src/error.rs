use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use suzuno::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Non-standard "client closed request" status. Never reaches a client,
/// but keeps abandoned requests distinct in access logs.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// The client went away; no body is produced.
    #[error("Client closed request")]
    ClientClosed,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Decode(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::ClientClosed => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::Decode(_) => "DECODE_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::ClientClosed => "CLIENT_CLOSED",
        }
    }

    /// Message safe to show a client. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ServerError::Decode(_) => "thumbnail generation failed".to_string(),
            ServerError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if matches!(self, ServerError::ClientClosed) {
            return status.into_response();
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound => ServerError::NotFound,
            PipelineError::BadRequest(msg) => ServerError::BadRequest(msg),
            PipelineError::Decode(err) => ServerError::Decode(err.to_string()),
            PipelineError::Cancelled => ServerError::ClientClosed,
            other => ServerError::Internal(other.to_string()),
        }
    }
}
