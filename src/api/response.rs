//! JSON response helpers that also record the request's event log entry

use std::fmt::Display;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::api::types::ErrorResponse;
use crate::domain::EventLog;

/// Error code used when the response body cannot be serialized
pub const UNABLE_TO_WRITE_RESPONSE: i32 = 20000;

/// Serialize `entity` with `status` and record an info event
pub fn write<T: Serialize>(
    log: &EventLog,
    status: StatusCode,
    event_id: i64,
    message: &str,
    entity: &T,
) -> Response {
    match serde_json::to_string(entity) {
        Ok(body) => {
            log.info(event_id, format!("{}, response: {}", message, body));
            json_response(status, body)
        }
        Err(e) => write_error_with_event_id(
            log,
            StatusCode::INTERNAL_SERVER_ERROR,
            event_id,
            &e,
            ErrorResponse::new(UNABLE_TO_WRITE_RESPONSE, "unable to write response"),
        ),
    }
}

/// Write an error body, using its error code as the event ID
pub fn write_error(
    log: &EventLog,
    status: StatusCode,
    cause: &dyn Display,
    response: ErrorResponse,
) -> Response {
    let event_id = i64::from(response.error_code);
    write_error_with_event_id(log, status, event_id, cause, response)
}

/// Write an error body and record an error event for 5xx statuses, warn otherwise
pub fn write_error_with_event_id(
    log: &EventLog,
    status: StatusCode,
    event_id: i64,
    cause: &dyn Display,
    response: ErrorResponse,
) -> Response {
    let body = match serde_json::to_string(&response) {
        Ok(body) => body,
        Err(e) => {
            error!("Unable to write error response: {}", e);
            log.error(
                i64::from(UNABLE_TO_WRITE_RESPONSE),
                format!("unable to write error response: {}: {}", e, cause),
            );
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let message = format!(
        "error: {{errorCode: {}, errorMessage: {}}}: {}",
        response.error_code, response.error_message, cause
    );
    if status.is_server_error() {
        log.error(event_id, message);
    } else {
        log.warn(event_id, message);
    }

    json_response(status, body)
}

fn json_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response()
}
