//! restful-filters
//!
//! HTTP request filters for axum services:
//! - Access, common and event logging with sensitive-field masking
//! - Trace ID propagation and CORS
//! - JWT authentication with permission, role, email, audience and scope checks

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use api::middleware::{
    extract_default, AccessLogFilter, AuthFilter, CrossOriginResourceSharing, EventLogFilter,
};
use api::state::AppState;
use domain::MaskingEngine;
use infrastructure::auth::JwtTokenValidator;

const DEFAULT_REALM: &str = "local";

/// Build the filters shared by the demo service from configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let masking = MaskingEngine::new();

    let cors = CrossOriginResourceSharing::new(&config.cors)
        .context("Invalid CORS configuration")?;

    let realm = config
        .auth
        .realm_name
        .clone()
        .unwrap_or_else(|| DEFAULT_REALM.to_string());

    let auth = if config.auth.jwks_url.is_some() || config.auth.jwt_secret.is_some() {
        let validator = JwtTokenValidator::from_config(&config.auth)
            .await
            .context("Failed to create token validator")?;
        info!("Token validator configured");

        Some(
            AuthFilter::new(Arc::new(validator))
                .with_dev_stack_traceable(config.auth.dev_stack_traceable()),
        )
    } else {
        None
    };

    Ok(AppState {
        access_log: AccessLogFilter::new(config.access_log.clone(), masking),
        cors: Arc::new(cors),
        event_log: EventLogFilter::new(realm, extract_default),
        auth,
    })
}
