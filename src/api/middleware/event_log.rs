//! Event log filter
//!
//! Installs an [`EventLog`] for the request. Handlers record an event ID,
//! level and message on it; once the chain returns a recorded event is
//! written on the `event_log` target.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::access_log::header_value;
use super::attributes::RequestAttributes;
use super::source_ip::public_source_ip;
use super::trace::{SESSION_ID_HEADER, TRACE_ID_HEADER};
use crate::domain::auth::JwtClaims;
use crate::domain::{Event, EventLevel, EventLog};
use crate::infrastructure::logging::EVENT_LOG_TARGET;

const EVENT_LOG_TYPE: &str = "event";

/// Identity attached to a logged event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIdentity {
    pub user_id: String,
    pub client_ids: Vec<String>,
    pub namespace: String,
    pub trace_id: String,
    pub session_id: String,
}

/// Resolves the event identity from request headers and token claims
pub type ExtractAttribute = fn(&HeaderMap, Option<&JwtClaims>) -> EventIdentity;

/// Identity from the token claims plus trace and session headers
pub fn extract_default(headers: &HeaderMap, claims: Option<&JwtClaims>) -> EventIdentity {
    let trace_id = header_value(headers, TRACE_ID_HEADER);
    let session_id = header_value(headers, SESSION_ID_HEADER);

    match claims {
        Some(claims) => EventIdentity {
            user_id: claims.sub.clone(),
            client_ids: vec![claims.client_id.clone()],
            namespace: claims.namespace.clone(),
            trace_id,
            session_id,
        },
        None => EventIdentity {
            trace_id,
            session_id,
            ..Default::default()
        },
    }
}

/// Empty identity
pub fn extract_null(_headers: &HeaderMap, _claims: Option<&JwtClaims>) -> EventIdentity {
    EventIdentity::default()
}

/// Event log filter state
#[derive(Clone)]
pub struct EventLogFilter {
    realm: String,
    extract: ExtractAttribute,
}

impl EventLogFilter {
    pub fn new(realm: impl Into<String>, extract: ExtractAttribute) -> Self {
        Self {
            realm: realm.into(),
            extract,
        }
    }
}

/// Event log middleware; use with `from_fn_with_state(filter, event_log)`
pub async fn event_log(
    State(filter): State<EventLogFilter>,
    mut request: Request,
    next: Next,
) -> Response {
    let handle = EventLog::new(Event {
        realm: filter.realm.clone(),
        source_ip: public_source_ip(request.headers()).unwrap_or_default(),
        level: EventLevel::Info,
        ..Default::default()
    });
    request.extensions_mut().insert(handle.clone());
    let attributes = RequestAttributes::ensure(request.extensions_mut());
    let headers = request.headers().clone();

    let response = next.run(request).await;

    let event = handle.snapshot();
    if event.id == 0 {
        return response;
    }

    let claims = attributes.snapshot().claims;
    let identity = (filter.extract)(&headers, claims.as_ref());
    write_event(&event, &identity);

    response
}

fn write_event(event: &Event, identity: &EventIdentity) {
    let additional_fields = Value::Object(event.additional_fields.clone());
    let client_id = identity.client_ids.join(",");

    macro_rules! emit {
        ($level:ident) => {
            $level!(
                target: EVENT_LOG_TARGET,
                event_id = event.id,
                log_type = EVENT_LOG_TYPE,
                realm = %event.realm,
                source_ip = %event.source_ip,
                user_id = %identity.user_id,
                client_id = %client_id,
                namespace = %identity.namespace,
                target_user_id = %event.target_user_id,
                target_namespace = %event.target_namespace,
                trace_id = %identity.trace_id,
                session_id = %identity.session_id,
                additional_fields = %additional_fields,
                "{}",
                event.message
            )
        };
    }

    match event.level {
        EventLevel::Fatal | EventLevel::Error => emit!(error),
        EventLevel::Warn => emit!(warn),
        EventLevel::Debug => emit!(debug),
        EventLevel::Info => emit!(info),
    }
}

/// The request's event log, or a detached one when no event log filter runs
impl<S> FromRequestParts<S> for EventLog
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<EventLog>().cloned().unwrap_or_default())
    }
}
