//! Trace ID propagation

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::error;
use uuid::Uuid;

use super::attributes::RequestAttributes;

pub const TRACE_ID_HEADER: &str = "x-ab-traceid";
pub const SESSION_ID_HEADER: &str = "x-ab-sessionid";

/// `{unix seconds in hex}-{uuid v4 without dashes}`
pub fn generate_trace_id() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();

    format!("{:x}-{}", seconds, Uuid::new_v4().simple())
}

/// Ensure every request carries an `X-Ab-TraceID` header
pub async fn trace_id(mut request: Request, next: Next) -> Response {
    let existing = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let trace_id = match existing {
        Some(trace_id) => trace_id,
        None => {
            let generated = generate_trace_id();
            match HeaderValue::from_str(&generated) {
                Ok(value) => {
                    request.headers_mut().insert(TRACE_ID_HEADER, value);
                }
                Err(e) => error!("Unable to set trace id header: {}", e),
            }
            generated
        }
    };

    RequestAttributes::ensure(request.extensions_mut()).set_trace_id(trace_id);

    next.run(request).await
}
