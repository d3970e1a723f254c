use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{
    access_log, common_log, cors_filter, event_log, metrics_middleware, trace_id,
};
use super::state::AppState;
use super::v1;

/// Create the demo service router with the full filter chain.
///
/// Filters run outermost first: trace id, CORS, metrics, common log, access
/// log, event log. Per-route filters (log attribute, auth) run inside them.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .nest("/v1", v1::create_v1_router(&state))
        .layer(middleware::from_fn_with_state(state.event_log.clone(), event_log))
        .layer(middleware::from_fn_with_state(state.access_log.clone(), access_log))
        .layer(middleware::from_fn(common_log))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn_with_state(state.cors.clone(), cors_filter))
        .layer(middleware::from_fn(trace_id))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Request,
        http::{header, StatusCode},
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::middleware::{
        extract_default, AccessLogFilter, AuthFilter, CrossOriginResourceSharing, EventLogFilter,
        TRACE_ID_HEADER,
    };
    use crate::config::{AccessLogConfig, CorsConfig};
    use crate::domain::MaskingEngine;
    use crate::infrastructure::auth::JwtTokenValidator;

    const SECRET: &str = "router-test-secret";

    fn state(with_auth: bool) -> AppState {
        let masking = MaskingEngine::new();
        let auth = with_auth.then(|| {
            AuthFilter::new(Arc::new(JwtTokenValidator::from_secret(SECRET)))
        });

        AppState {
            access_log: AccessLogFilter::new(AccessLogConfig::default(), masking),
            cors: Arc::new(CrossOriginResourceSharing::new(&CorsConfig::default()).unwrap()),
            event_log: EventLogFilter::new("test", extract_default),
            auth,
        }
    }

    fn token(namespace: &str, sub: &str, permissions: Value) -> String {
        let claims = json!({
            "sub": sub,
            "namespace": namespace,
            "client_id": "client-1",
            "permissions": permissions,
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = create_router(state(false))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_login_returns_body() {
        let response = create_router(state(false))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/namespaces/ns/login?password=secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(TRACE_ID_HEADER, "trace-1")
                    .body(Body::from(
                        r#"{"username":"frank","password":"secret","email":"frank@example.net"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["username"], "frank");
        assert_eq!(body["email"], "frank@example.net");
        assert_eq!(body["token"].as_str().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_json() {
        let response = create_router(state(false))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/namespaces/ns/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["errorCode"], 20002);
    }

    #[tokio::test]
    async fn test_user_routes_absent_without_auth() {
        let response = create_router(state(false))
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns/users/user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_user_with_permission() {
        let token = token(
            "ns",
            "user-1",
            json!([{"resource": "NAMESPACE:ns:USER:user-1", "action": 2}]),
        );
        let response = create_router(state(true))
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns/users/user-1")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["userId"], "user-1");
        assert_eq!(body["clientId"], "client-1");
    }

    #[tokio::test]
    async fn test_get_user_without_permission() {
        let token = token(
            "ns",
            "user-1",
            json!([{"resource": "NAMESPACE:ns:USER:other", "action": 2}]),
        );
        let response = create_router(state(true))
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns/users/user-1")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["errorCode"], 1154002);
    }

    #[tokio::test]
    async fn test_greeting_public_and_authenticated() {
        let app = create_router(state(true));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns/greeting")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["message"], "hello, guest");

        let token = token("ns", "user-1", json!([]));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns/greeting")
                    .header(header::COOKIE, format!("access_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["message"], "hello, user-1");
    }
}
