// src/server/error.rs
// HTTP error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::error::RelayError;

/// Error returned by the HTTP handlers, rendered as an OpenAI-style
/// `{"error": {...}}` body
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_type: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            error_type: "invalid_request_error",
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::UNAUTHORIZED,
            error_type: "authentication_error",
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_GATEWAY,
            error_type: "upstream_error",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            error_type: "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidRequest(msg) => Self::bad_request(msg),
            RelayError::Unauthorized(msg) => Self::unauthorized(msg),
            e @ (RelayError::Provider { .. } | RelayError::Stream(_) | RelayError::Http(_)) => {
                Self::bad_gateway(e.to_string())
            }
            e => {
                error!(error = %e, "Internal error");
                Self::internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "type": self.error_type,
                "code": self.status_code.as_u16(),
            }
        });

        (self.status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_mapping() {
        let err: ApiError = RelayError::InvalidRequest("bad temperature".into()).into();
        assert_eq!(err.status_code, StatusCode::BAD_REQUEST);

        let err: ApiError = RelayError::Unauthorized("no key".into()).into();
        assert_eq!(err.status_code, StatusCode::UNAUTHORIZED);

        let err: ApiError = RelayError::Provider {
            provider: "claude",
            status: 529,
            body: "overloaded".into(),
        }
        .into();
        assert_eq!(err.status_code, StatusCode::BAD_GATEWAY);
        assert!(err.message.contains("overloaded"));

        let err: ApiError = RelayError::Config("missing url".into()).into();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
