//! Shared state of the demo service

use std::sync::Arc;

use crate::api::middleware::{AccessLogFilter, AuthFilter, CrossOriginResourceSharing, EventLogFilter};

/// Filters and services shared by every route
#[derive(Clone)]
pub struct AppState {
    pub access_log: AccessLogFilter,
    pub cors: Arc<CrossOriginResourceSharing>,
    pub event_log: EventLogFilter,
    /// `None` when no token validator is configured; protected routes are not mounted
    pub auth: Option<AuthFilter>,
}
