//! Common Log Format filter

use axum::{
    extract::Request,
    http::{header, Uri},
    middleware::Next,
    response::Response,
};
use chrono::Local;
use tracing::info;

use super::source_ip::public_source_ip;
use crate::infrastructure::logging::COMMON_LOG_TARGET;

/// Log `ip - user [time] "METHOD uri PROTO" status length` after the chain
pub async fn common_log(request: Request, next: Next) -> Response {
    let source_ip = public_source_ip(request.headers()).unwrap_or_default();
    let username = username(request.uri());
    let method = request.method().clone();
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let version = request.version();

    let response = next.run(request).await;

    let length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_default();

    info!(
        target: COMMON_LOG_TARGET,
        "{} - {} [{}] \"{} {} {:?}\" {} {}",
        source_ip,
        username,
        Local::now().format("%d/%b/%Y:%H:%M:%S %z"),
        method,
        uri,
        version,
        response.status().as_u16(),
        length
    );

    response
}

/// User from the URI's userinfo, `-` when absent
fn username(uri: &Uri) -> String {
    uri.authority()
        .and_then(|authority| authority.as_str().rsplit_once('@'))
        .map(|(userinfo, _)| userinfo.split(':').next().unwrap_or_default())
        .filter(|name| !name.is_empty())
        .unwrap_or("-")
        .to_string()
}
