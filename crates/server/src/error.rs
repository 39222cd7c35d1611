use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use batch::BatchError;
use engine::EngineError;
use store::{StoreError, StoreErrorKind};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    #[error("Match engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
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
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Engine(EngineError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ServerError::Engine(EngineError::UpstreamUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Batch(err) => match err {
                BatchError::CompanyNotFound(_) | BatchError::JobNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                BatchError::InvalidRequest(_)
                | BatchError::InvalidSchedule(_)
                | BatchError::NegativeDelta => StatusCode::BAD_REQUEST,
                BatchError::ScheduleBusy(_) => StatusCode::CONFLICT,
                BatchError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ServerError::Store(err) => match err.kind {
                StoreErrorKind::NotFound => StatusCode::NOT_FOUND,
                StoreErrorKind::Conflict => StatusCode::CONFLICT,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
            ServerError::Internal(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Engine(EngineError::InvalidInput(_)) => "INVALID_INPUT",
            ServerError::Engine(EngineError::UpstreamUnavailable(_)) => "UPSTREAM_UNAVAILABLE",
            ServerError::Batch(err) => match err {
                BatchError::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
                BatchError::JobNotFound(_) => "JOB_NOT_FOUND",
                BatchError::ScheduleBusy(_) => "SCHEDULE_BUSY",
                BatchError::InvalidRequest(_) | BatchError::InvalidSchedule(_) => "BAD_REQUEST",
                BatchError::NegativeDelta => "BAD_REQUEST",
                BatchError::Store(_) => "UPSTREAM_UNAVAILABLE",
            },
            ServerError::Store(err) => match err.kind {
                StoreErrorKind::NotFound => "NOT_FOUND",
                StoreErrorKind::Conflict => "CONFLICT",
                _ => "UPSTREAM_UNAVAILABLE",
            },
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
