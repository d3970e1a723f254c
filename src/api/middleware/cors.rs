//! Cross-origin resource sharing filter
//!
//! Requests without an `Origin` header, or from origins that are not
//! allowed, pass through untouched. Preflight requests from allowed origins
//! are answered here with an empty 200.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::CorsConfig;
use crate::domain::DomainError;

/// Prefix marking an allowed domain as a regular expression
pub const ALLOWED_DOMAINS_REGEX_PREFIX: &str = "re:";

#[derive(Debug, Clone)]
enum AllowedDomain {
    Any,
    Exact(String),
    Pattern(Regex),
}

impl AllowedDomain {
    fn parse(domain: &str) -> Result<Self, regex::Error> {
        if domain == "*" {
            return Ok(Self::Any);
        }
        match domain.strip_prefix(ALLOWED_DOMAINS_REGEX_PREFIX) {
            Some(pattern) => Regex::new(pattern).map(Self::Pattern),
            None => Ok(Self::Exact(domain.to_string())),
        }
    }

    fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(domain) => domain == origin,
            Self::Pattern(pattern) => pattern.is_match(origin),
        }
    }
}

/// CORS filter built from [`CorsConfig`]
#[derive(Debug, Clone)]
pub struct CrossOriginResourceSharing {
    expose_headers: Vec<String>,
    allowed_headers: Vec<String>,
    allowed_domains: Vec<AllowedDomain>,
    allowed_methods: Vec<String>,
    max_age: u64,
    cookies_allowed: bool,
}

impl CrossOriginResourceSharing {
    /// Fails when a `re:` domain is not a valid regular expression
    pub fn new(config: &CorsConfig) -> Result<Self, DomainError> {
        let allowed_domains = config
            .allowed_domains
            .iter()
            .map(|domain| {
                AllowedDomain::parse(domain).map_err(|e| {
                    DomainError::configuration(format!("invalid allowed domain {}: {}", domain, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expose_headers: config.expose_headers.clone(),
            allowed_headers: config.allowed_headers.clone(),
            allowed_domains,
            allowed_methods: config.allowed_methods.clone(),
            max_age: config.max_age,
            cookies_allowed: config.cookies_allowed,
        })
    }

    fn is_origin_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        self.allowed_domains.is_empty() || self.allowed_domains.iter().any(|d| d.allows(origin))
    }

    fn is_valid_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|allowed| allowed == method)
    }

    fn is_valid_header(&self, name: &str) -> bool {
        self.allowed_headers
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(name))
    }

    fn preflight(&self, request_headers: &HeaderMap, origin: &str) -> Response {
        let mut response = StatusCode::OK.into_response();

        let requested_method = header_str(request_headers, header::ACCESS_CONTROL_REQUEST_METHOD);
        if !self.is_valid_method(requested_method) {
            debug!(
                "Http header {}:{} is not in {:?}",
                header::ACCESS_CONTROL_REQUEST_METHOD,
                requested_method,
                self.allowed_methods
            );
            return response;
        }

        let requested_headers = header_str(request_headers, header::ACCESS_CONTROL_REQUEST_HEADERS);
        if !requested_headers.is_empty()
            && !requested_headers
                .split(',')
                .all(|name| self.is_valid_header(name.trim()))
        {
            debug!(
                "Http header {}:{} is not in {:?}",
                header::ACCESS_CONTROL_REQUEST_HEADERS,
                requested_headers,
                self.allowed_headers
            );
            return response;
        }

        let headers = response.headers_mut();
        append(headers, header::ACCESS_CONTROL_ALLOW_METHODS, &self.allowed_methods.join(","));
        append(headers, header::ACCESS_CONTROL_ALLOW_HEADERS, requested_headers);
        if self.max_age > 0 {
            append(headers, header::ACCESS_CONTROL_MAX_AGE, &self.max_age.to_string());
        }
        self.set_options_headers(headers, origin);

        response
    }

    fn set_options_headers(&self, headers: &mut HeaderMap, origin: &str) {
        append(headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);

        if !self.expose_headers.is_empty() {
            append(
                headers,
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                &self.expose_headers.join(","),
            );
        }

        if self.cookies_allowed {
            append(headers, header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn append(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.append(name, value);
        }
        Err(e) => warn!("Skipping {} header: {}", name, e),
    }
}

fn is_preflight(request: &Request<Body>) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .is_some_and(|value| !value.is_empty())
}

/// CORS middleware; use with `from_fn_with_state(Arc::new(cors), cors_filter)`
pub async fn cors_filter(
    State(cors): State<Arc<CrossOriginResourceSharing>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = header_str(request.headers(), header::ORIGIN).to_string();
    if origin.is_empty() {
        return next.run(request).await;
    }

    if !cors.is_origin_allowed(&origin) {
        debug!("HTTP Origin:{} is not part of allowed domains", origin);
        return next.run(request).await;
    }

    if is_preflight(&request) {
        return cors.preflight(request.headers(), &origin);
    }

    let mut response = next.run(request).await;
    cors.set_options_headers(response.headers_mut(), &origin);
    response
}
