//! Request filters
//!
//! Each filter is an axum `from_fn` middleware. Filters that need state take
//! it through `from_fn_with_state`. Values shared between filters travel in
//! [`RequestAttributes`] stored in the request extensions.

pub mod access_log;
pub mod attributes;
pub mod auth;
pub mod common_log;
pub mod cors;
pub mod event_log;
pub mod log_attribute;
pub mod metrics;
pub mod source_ip;
pub mod trace;

pub use access_log::{access_log, AccessLogFilter};
pub use attributes::{LogAttributes, LogIdentity, RequestAttributes};
pub use auth::{authenticate, parse_access_token, retrieve_jwt_claims, AuthFilter, AuthGuard, FilterOption};
pub use common_log::common_log;
pub use cors::{cors_filter, CrossOriginResourceSharing};
pub use event_log::{event_log, extract_default, extract_null, EventIdentity, EventLogFilter, ExtractAttribute};
pub use log_attribute::{log_attribute, LogOption};
pub use metrics::metrics_middleware;
pub use source_ip::public_source_ip;
pub use trace::{generate_trace_id, trace_id, SESSION_ID_HEADER, TRACE_ID_HEADER};
