//! Demo login endpoint exercising body and query masking

use axum::{extract::Path, http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{LogOption, RequestAttributes};
use crate::api::response;
use crate::api::types::Json;
use crate::domain::EventLog;

pub const EID_LOGIN_SUCCEEDED: i64 = 1101;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub email: String,
    pub token: String,
}

/// Masking applied to the login route's access log line
pub fn log_option() -> LogOption {
    LogOption::new()
        .query_params("password,token")
        .request_fields("password")
        .response_fields("token")
        .pii_request_fields("email")
        .pii_response_fields("email")
}

pub async fn login(
    Path(namespace): Path<String>,
    attributes: RequestAttributes,
    log: EventLog,
    Json(request): Json<LoginRequest>,
) -> Response {
    attributes.set_namespace(namespace.clone());
    attributes.set_user_id(request.username.clone());

    let body = LoginResponse {
        username: request.username,
        email: request.email,
        token: Uuid::new_v4().simple().to_string(),
    };
    log.target_user(body.username.clone(), namespace);

    response::write(&log, StatusCode::OK, EID_LOGIN_SUCCEEDED, "login succeeded", &body)
}
