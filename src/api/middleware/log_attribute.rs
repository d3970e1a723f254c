//! Per-endpoint log attributes
//!
//! Attach with `route_layer(from_fn_with_state(Arc::new(option), log_attribute))`.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use super::attributes::RequestAttributes;

/// Fields to mask in the access log, each a comma separated list of names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOption {
    /// Query params masked fully in the URI
    pub masked_query_params: String,
    /// Fields masked fully in the request body
    pub masked_request_fields: String,
    /// Fields masked fully in the response body
    pub masked_response_fields: String,
    pub masked_pii_query_params: String,
    pub masked_pii_request_fields: String,
    pub masked_pii_response_fields: String,
}

impl LogOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_params(mut self, fields: impl Into<String>) -> Self {
        self.masked_query_params = fields.into();
        self
    }

    pub fn request_fields(mut self, fields: impl Into<String>) -> Self {
        self.masked_request_fields = fields.into();
        self
    }

    pub fn response_fields(mut self, fields: impl Into<String>) -> Self {
        self.masked_response_fields = fields.into();
        self
    }

    pub fn pii_query_params(mut self, fields: impl Into<String>) -> Self {
        self.masked_pii_query_params = fields.into();
        self
    }

    pub fn pii_request_fields(mut self, fields: impl Into<String>) -> Self {
        self.masked_pii_request_fields = fields.into();
        self
    }

    pub fn pii_response_fields(mut self, fields: impl Into<String>) -> Self {
        self.masked_pii_response_fields = fields.into();
        self
    }

    pub(crate) fn merge(&mut self, other: &LogOption) {
        fn take(target: &mut String, value: &str) {
            if !value.is_empty() {
                *target = value.to_string();
            }
        }

        take(&mut self.masked_query_params, &other.masked_query_params);
        take(&mut self.masked_request_fields, &other.masked_request_fields);
        take(&mut self.masked_response_fields, &other.masked_response_fields);
        take(&mut self.masked_pii_query_params, &other.masked_pii_query_params);
        take(&mut self.masked_pii_request_fields, &other.masked_pii_request_fields);
        take(&mut self.masked_pii_response_fields, &other.masked_pii_response_fields);
    }
}

/// Record the endpoint's masking options and operation for the access log
pub async fn log_attribute(
    State(option): State<Arc<LogOption>>,
    mut request: Request,
    next: Next,
) -> Response {
    let attributes = RequestAttributes::ensure(request.extensions_mut());
    attributes.set_masking(&option);

    if let Some(path) = request.extensions().get::<MatchedPath>() {
        attributes.set_operation(path.as_str());
    }

    next.run(request).await
}
