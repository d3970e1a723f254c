//! Per-request attribute bag shared between filters
//!
//! Inner filters (log attributes, auth, trace) write here and outer filters
//! (access log, event log) read the values back once the inner chain has
//! returned. The bag is created by whichever filter touches the request first.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{extract::FromRequestParts, http::request::Parts, http::Extensions};

use super::log_attribute::LogOption;
use crate::domain::auth::JwtClaims;

/// Values recorded for the request so far
#[derive(Debug, Clone, Default)]
pub struct LogAttributes {
    pub masking: LogOption,
    /// Route template of the matched endpoint
    pub operation: Option<String>,
    pub trace_id: Option<String>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub namespace: Option<String>,
    pub claims: Option<JwtClaims>,
}

/// Shared handle to the request's [`LogAttributes`]
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    inner: Arc<Mutex<LogAttributes>>,
}

impl RequestAttributes {
    /// The bag stored in `extensions`, inserting a new one if absent
    pub fn ensure(extensions: &mut Extensions) -> Self {
        if let Some(existing) = extensions.get::<RequestAttributes>() {
            return existing.clone();
        }

        let attributes = RequestAttributes::default();
        extensions.insert(attributes.clone());
        attributes
    }

    fn lock(&self) -> MutexGuard<'_, LogAttributes> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> LogAttributes {
        self.lock().clone()
    }

    /// Merge masking options; non-empty values replace earlier ones
    pub fn set_masking(&self, option: &LogOption) {
        self.lock().masking.merge(option);
    }

    pub fn set_operation(&self, operation: impl Into<String>) {
        self.lock().operation = Some(operation.into());
    }

    pub fn set_trace_id(&self, trace_id: impl Into<String>) {
        self.lock().trace_id = Some(trace_id.into());
    }

    /// Override the user ID written to the access log
    pub fn set_user_id(&self, user_id: impl Into<String>) {
        self.lock().user_id = Some(user_id.into());
    }

    /// Override the client ID written to the access log
    pub fn set_client_id(&self, client_id: impl Into<String>) {
        self.lock().client_id = Some(client_id.into());
    }

    /// Override the namespace written to the access log
    pub fn set_namespace(&self, namespace: impl Into<String>) {
        self.lock().namespace = Some(namespace.into());
    }

    pub fn set_claims(&self, claims: Option<JwtClaims>) {
        self.lock().claims = claims;
    }
}

impl<S> FromRequestParts<S> for RequestAttributes
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::ensure(&mut parts.extensions))
    }
}

/// Identity for log lines: explicit overrides first, then token claims
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogIdentity {
    pub namespace: String,
    pub user_id: String,
    pub client_id: String,
}

impl LogAttributes {
    pub fn identity(&self) -> LogIdentity {
        let claims = self.claims.as_ref();
        let pick = |explicit: &Option<String>, from_claims: Option<&String>| {
            explicit
                .as_ref()
                .filter(|value| !value.is_empty())
                .or(from_claims)
                .cloned()
                .unwrap_or_default()
        };

        LogIdentity {
            namespace: pick(&self.namespace, claims.map(|c| &c.namespace)),
            user_id: pick(&self.user_id, claims.map(|c| &c.sub)),
            client_id: pick(&self.client_id, claims.map(|c| &c.client_id)),
        }
    }
}
