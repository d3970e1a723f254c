//! Demo user endpoints protected by the auth filter

use axum::{
    extract::{Path, Request},
    http::StatusCode,
    response::Response,
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::retrieve_jwt_claims;
use crate::api::response;
use crate::api::types::ErrorResponse;
use crate::domain::auth::JwtClaims;
use crate::domain::EventLog;

pub const EID_GET_USER: i64 = 1201;
pub const EID_GREETING: i64 = 1202;
pub const EID_USER_NOT_IN_NAMESPACE: i32 = 1204001;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub namespace: String,
    pub client_id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

pub async fn get_user(
    Path((namespace, user_id)): Path<(String, String)>,
    Extension(claims): Extension<JwtClaims>,
    log: EventLog,
) -> Response {
    log.target_user(user_id.clone(), namespace.clone());

    if claims.namespace != namespace {
        return response::write_error(
            &log,
            StatusCode::NOT_FOUND,
            &format!("token namespace {} does not match {}", claims.namespace, namespace),
            ErrorResponse::new(EID_USER_NOT_IN_NAMESPACE, "user not found"),
        );
    }

    let profile = UserProfile {
        user_id,
        namespace,
        client_id: claims.client_id.clone(),
        roles: claims.roles.clone(),
    };
    response::write(&log, StatusCode::OK, EID_GET_USER, "get user", &profile)
}

/// Greets the caller by subject, or anonymously without a token
pub async fn greeting(log: EventLog, request: Request) -> Response {
    let message = match retrieve_jwt_claims(&request) {
        Some(claims) if !claims.sub.is_empty() => format!("hello, {}", claims.sub),
        _ => "hello, guest".to_string(),
    };

    response::write(&log, StatusCode::OK, EID_GREETING, "greeting", &Greeting { message })
}
