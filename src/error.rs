//! Error taxonomy for cursor-sim.
//!
//! A single enum carries every error kind the generation pipeline and HTTP layer can
//! produce, mapped 1:1 onto HTTP status codes and the `{error, message}` envelope every
//! endpoint uses for failures.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, CursorSimError>;

#[derive(Error, Debug)]
pub enum CursorSimError {
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("generation failed at stage {stage}: {reason}")]
    GenerationFailed { stage: String, reason: String },

    #[error("mode not supported: {0}")]
    ModeNotSupported(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// JSON body returned for every error response, per spec's `{error, message}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl CursorSimError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CursorSimError::InvalidSeed(_) => StatusCode::BAD_REQUEST,
            CursorSimError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CursorSimError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CursorSimError::Forbidden(_) => StatusCode::FORBIDDEN,
            CursorSimError::NotFound(_) => StatusCode::NOT_FOUND,
            CursorSimError::Conflict(_) => StatusCode::CONFLICT,
            CursorSimError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            CursorSimError::GenerationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CursorSimError::ModeNotSupported(_) => StatusCode::BAD_REQUEST,
            CursorSimError::ResourceExhausted(_) => StatusCode::INSUFFICIENT_STORAGE,
            CursorSimError::Cancelled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CursorSimError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            CursorSimError::Io(_) | CursorSimError::Json(_) | CursorSimError::Yaml(_) | CursorSimError::Csv(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The short `error` field used in the `{error, message}` envelope.
    pub fn error_label(&self) -> &'static str {
        match self {
            CursorSimError::InvalidSeed(_) => "InvalidSeed",
            CursorSimError::InvalidRequest(_) => "Bad Request",
            CursorSimError::Unauthorized(_) => "Unauthorized",
            CursorSimError::Forbidden(_) => "Forbidden",
            CursorSimError::NotFound(_) => "Not Found",
            CursorSimError::Conflict(_) => "Conflict",
            CursorSimError::RateLimited(_) => "Too Many Requests",
            CursorSimError::GenerationFailed { .. } => "GenerationFailed",
            CursorSimError::ModeNotSupported(_) => "ModeNotSupported",
            CursorSimError::ResourceExhausted(_) => "ResourceExhausted",
            CursorSimError::Cancelled(_) => "Cancelled",
            CursorSimError::DeadlineExceeded(_) => "DeadlineExceeded",
            CursorSimError::Io(_) | CursorSimError::Json(_) | CursorSimError::Yaml(_) | CursorSimError::Csv(_) => {
                "Internal Server Error"
            }
        }
    }

    fn should_log(&self) -> bool {
        !matches!(
            self,
            CursorSimError::InvalidRequest(_)
                | CursorSimError::Unauthorized(_)
                | CursorSimError::NotFound(_)
                | CursorSimError::RateLimited(_)
        )
    }
}

impl IntoResponse for CursorSimError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log() {
            error!(error = %self, status = %status, "request failed");
        }

        let body = ErrorBody {
            error: self.error_label().to_string(),
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();

        if matches!(self, CursorSimError::Unauthorized(_)) {
            let headers = response.headers_mut();
            attach_www_authenticate(headers);
        }

        response
    }
}

fn attach_www_authenticate(headers: &mut HeaderMap) {
    headers.insert(
        "WWW-Authenticate",
        HeaderValue::from_static("Basic realm=\"cursor-sim\""),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_invalid_request_to_400() {
        let e = CursorSimError::InvalidRequest("invalid startDate: foo".into());
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.error_label(), "Bad Request");
    }

    #[test]
    fn maps_unauthorized_to_401() {
        let e = CursorSimError::Unauthorized("Invalid API key".into());
        assert_eq!(e.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn maps_conflict_to_409() {
        let e = CursorSimError::Conflict("regenerate in progress".into());
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn maps_rate_limited_to_429() {
        let e = CursorSimError::RateLimited("token bucket empty".into());
        assert_eq!(e.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
