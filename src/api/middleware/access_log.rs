//! Access log filter
//!
//! Writes one line per request on the `access_log` target. With full access
//! logging enabled, request and response bodies of supported content types
//! are included after masking the fields named by the endpoint's
//! [`LogOption`](super::log_attribute::LogOption).

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{error, info};

use super::attributes::{LogAttributes, RequestAttributes};
use super::source_ip::source_ip_or_dash;
use super::trace::TRACE_ID_HEADER;
use crate::config::AccessLogConfig;
use crate::domain::masking::{MaskStrategy, MaskingEngine};
use crate::infrastructure::json::minify_json;
use crate::infrastructure::logging::ACCESS_LOG_TARGET;

pub const FLIGHT_ID_HEADER: &str = "x-flight-id";
pub const GAME_CLIENT_VERSION_HEADER: &str = "game-client-version";
pub const SDK_VERSION_HEADER: &str = "x-sdk-version";
pub const OSS_VERSION_HEADER: &str = "x-oss-version";

const BODY_NOT_LOGGED: &str = "-";
const BODY_TOO_LARGE: &str = "data too large";
const KB: f32 = 1024.0;

/// Access log filter state
#[derive(Clone)]
pub struct AccessLogFilter {
    config: Arc<AccessLogConfig>,
    engine: MaskingEngine,
}

impl AccessLogFilter {
    pub fn new(config: AccessLogConfig, engine: MaskingEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    fn is_supported_content_type(&self, content_type: &str) -> bool {
        !content_type.is_empty()
            && self
                .config
                .supported_content_types
                .iter()
                .any(|supported| content_type.contains(supported.as_str()))
    }

    /// Rendered body and its size in KB
    fn render_body(&self, content_type: &str, body: &[u8], enabled: bool) -> RenderedBody {
        if body.is_empty() {
            return RenderedBody::default();
        }

        let size_kb = body.len() as f32 / KB;
        let text = if !self.config.full_enabled || !enabled {
            BODY_NOT_LOGGED.to_string()
        } else if body.len() > self.config.max_body_size {
            BODY_TOO_LARGE.to_string()
        } else if content_type.contains("application/json") {
            minify_json(body)
        } else {
            String::from_utf8_lossy(body)
                .replace('\n', "\\n")
                .replace('\r', "\\r")
        };

        RenderedBody { text, size_kb }
    }

    fn mask_body(
        &self,
        enabled: bool,
        content_type: &str,
        body: String,
        full_fields: &str,
        pii_fields: &str,
    ) -> String {
        if !self.config.full_enabled || !enabled || body.is_empty() {
            return body;
        }

        let mut body = body;
        if !full_fields.is_empty() {
            body = self
                .engine
                .mask_content(content_type, &body, full_fields, MaskStrategy::Full);
        }
        if !pii_fields.is_empty() {
            body = self
                .engine
                .mask_content(content_type, &body, pii_fields, MaskStrategy::Pii);
        }
        body
    }

    fn mask_uri(&self, uri: &str, attributes: &LogAttributes) -> String {
        let option = &attributes.masking;
        let mut uri = uri.to_string();
        if !option.masked_query_params.is_empty() {
            uri = self.engine.mask_query_params(&uri, &option.masked_query_params);
        }
        if !option.masked_pii_query_params.is_empty() {
            uri = self
                .engine
                .mask_pii_query_params(&uri, &option.masked_pii_query_params);
        }
        uri
    }
}

#[derive(Debug, Default)]
struct RenderedBody {
    text: String,
    size_kb: f32,
}

/// Request fields captured before the chain runs
struct RequestSnapshot {
    method: String,
    uri: String,
    source_ip: String,
    user_agent: String,
    referer: String,
    flight_id: String,
    game_version: String,
    sdk_version: String,
    oss_version: String,
    trace_id: String,
    content_type: String,
    operation: Option<String>,
}

impl RequestSnapshot {
    fn capture(request: &Request) -> Self {
        let headers = request.headers();
        let uri = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        Self {
            method: request.method().to_string(),
            uri,
            source_ip: source_ip_or_dash(headers),
            user_agent: header_value(headers, header::USER_AGENT.as_str()),
            referer: header_value(headers, header::REFERER.as_str()),
            flight_id: header_value(headers, FLIGHT_ID_HEADER),
            game_version: header_value(headers, GAME_CLIENT_VERSION_HEADER),
            sdk_version: header_value(headers, SDK_VERSION_HEADER),
            oss_version: header_value(headers, OSS_VERSION_HEADER),
            trace_id: header_value(headers, TRACE_ID_HEADER),
            content_type: header_value(headers, header::CONTENT_TYPE.as_str()),
            operation: request
                .extensions()
                .get::<MatchedPath>()
                .map(|path| path.as_str().to_string()),
        }
    }
}

pub(crate) fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn buffer(body: Body, what: &str) -> Bytes {
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to read {} body: {}", what, e);
            Bytes::new()
        }
    }
}

/// Access log middleware; use with `from_fn_with_state(filter, access_log)`
pub async fn access_log(
    State(filter): State<AccessLogFilter>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let attributes = RequestAttributes::ensure(request.extensions_mut());
    let snapshot = RequestSnapshot::capture(&request);

    let mut request_body = Bytes::new();
    if filter.is_supported_content_type(&snapshot.content_type) {
        let (parts, body) = request.into_parts();
        request_body = buffer(body, "request").await;
        request = Request::from_parts(parts, Body::from(request_body.clone()));
    }

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let response_content_type = header_value(response.headers(), header::CONTENT_TYPE.as_str());

    let (response, response_body) = if filter.is_supported_content_type(&response_content_type) {
        let (parts, body) = response.into_parts();
        let bytes = buffer(body, "response").await;
        (Response::from_parts(parts, Body::from(bytes.clone())), bytes)
    } else {
        (response, Bytes::new())
    };

    let length = if response_body.is_empty() {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or_default()
    } else {
        response_body.len()
    };

    let attrs = attributes.snapshot();
    let uri = filter.mask_uri(&snapshot.uri, &attrs);

    let request_rendered = filter.render_body(
        &snapshot.content_type,
        &request_body,
        filter.config.request_body_enabled,
    );
    let response_rendered = filter.render_body(
        &response_content_type,
        &response_body,
        filter.config.response_body_enabled,
    );

    let request_text = filter.mask_body(
        filter.config.request_body_enabled,
        &snapshot.content_type,
        request_rendered.text,
        &attrs.masking.masked_request_fields,
        &attrs.masking.masked_pii_request_fields,
    );
    let response_text = filter.mask_body(
        filter.config.response_body_enabled,
        &response_content_type,
        response_rendered.text,
        &attrs.masking.masked_response_fields,
        &attrs.masking.masked_pii_response_fields,
    );

    let identity = attrs.identity();
    let trace_id = attrs.trace_id.clone().unwrap_or(snapshot.trace_id);
    let operation = attrs.operation.clone().or(snapshot.operation).unwrap_or_default();

    let line = format!(
        concat!(
            "time={} log_type=access method={} path=\"{}\" status={} duration={} length={} ",
            "source_ip={} user_agent=\"{}\" referer=\"{}\" trace_id={} namespace={} user_id={} ",
            "client_id={} request_content_type=\"{}\" request_body=AB[{}]AB req_body_size_kb={:.3} ",
            "response_content_type=\"{}\" response_body=AB[{}]AB resp_body_size_kb={:.3} ",
            "operation=\"{}\" flight_id=\"{}\" game_version=\"{}\" sdk_version=\"{}\" oss_version=\"{}\""
        ),
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        snapshot.method,
        uri,
        status,
        start.elapsed().as_millis(),
        length,
        snapshot.source_ip,
        snapshot.user_agent,
        snapshot.referer,
        trace_id,
        identity.namespace,
        identity.user_id,
        identity.client_id,
        snapshot.content_type,
        request_text,
        request_rendered.size_kb,
        response_content_type,
        response_text,
        response_rendered.size_kb,
        operation,
        snapshot.flight_id,
        snapshot.game_version,
        snapshot.sdk_version,
        snapshot.oss_version,
    );

    info!(target: ACCESS_LOG_TARGET, "{}", line);

    response
}
