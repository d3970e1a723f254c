//! Error body returned by every filter and helper

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const INTERNAL_SERVER_ERROR: i32 = 20000;
pub const UNAUTHORIZED_ACCESS: i32 = 20001;
pub const VALIDATION_ERROR: i32 = 20002;
pub const TOKEN_IS_EXPIRED: i32 = 20003;

/// Wire error body: `{"errorCode": 20001, "errorMessage": "unauthorized access"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: i32,
    pub error_message: String,
}

impl ErrorResponse {
    pub fn new(error_code: i32, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
        }
    }
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(error_code, message),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_ACCESS, "unauthorized access")
    }

    pub fn token_expired() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, TOKEN_IS_EXPIRED, "token is expired")
    }

    pub fn forbidden(error_code: i32, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_code, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, VALIDATION_ERROR, message)
    }

    pub fn internal(error_code: i32, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error_code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::Unauthorized { .. } => Self::unauthorized(),
            DomainError::TokenExpired => Self::token_expired(),
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::Provider { .. }
            | DomainError::Configuration { .. }
            | DomainError::Internal { .. } => {
                Self::internal(INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status.as_u16(),
            self.response.error_code,
            self.response.error_message
        )
    }
}

impl std::error::Error for ApiError {}
