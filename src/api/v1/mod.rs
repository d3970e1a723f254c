//! Demo v1 endpoints wired through the filter chain

pub mod login;
pub mod users;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::warn;

use super::middleware::{authenticate, log_attribute, FilterOption};
use super::state::AppState;
use crate::domain::auth::ACTION_READ;

pub const USER_RESOURCE: &str = "NAMESPACE:{namespace}:USER:{userId}";

/// Routes are relative to `/v1`
pub fn create_v1_router(state: &AppState) -> Router {
    let mut router = Router::new().route(
        "/namespaces/{namespace}/login",
        post(login::login).route_layer(middleware::from_fn_with_state(
            Arc::new(login::log_option()),
            log_attribute,
        )),
    );

    match &state.auth {
        Some(auth) => {
            let user_guard = auth.auth(vec![
                FilterOption::ValidUser,
                FilterOption::permission(USER_RESOURCE, ACTION_READ),
            ]);
            let public_guard = auth.public_auth(vec![FilterOption::ValidUser]);

            router = router
                .route(
                    "/namespaces/{namespace}/users/{userId}",
                    get(users::get_user)
                        .route_layer(middleware::from_fn_with_state(user_guard, authenticate)),
                )
                .route(
                    "/namespaces/{namespace}/greeting",
                    get(users::greeting)
                        .route_layer(middleware::from_fn_with_state(public_guard, authenticate)),
                );
        }
        None => warn!("No token validator configured, user endpoints are disabled"),
    }

    router
}
