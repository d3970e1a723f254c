//! Access token filter
//!
//! The token is read from `Authorization: Bearer <token>` or the
//! `access_token` cookie. Validated claims are stored in the request
//! extensions (see [`retrieve_jwt_claims`]) and in the request attributes
//! for the outer log filters.
//!
//! ```ignore
//! let guard = auth_filter.auth(vec![FilterOption::ValidUser, FilterOption::permission(
//!     "NAMESPACE:{namespace}:USER:{userId}", ACTION_READ,
//! )]);
//! get(handler).route_layer(middleware::from_fn_with_state(guard, authenticate))
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{RawPathParams, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use tracing::{debug, warn};

use super::attributes::RequestAttributes;
use crate::api::types::ApiError;
use crate::domain::auth::{JwtClaims, Permission, TokenValidator};

const ACCESS_TOKEN_COOKIE: &str = "access_token";

pub const EID_NON_USER_ACCESS_TOKEN: i32 = 1154001;
pub const EID_INSUFFICIENT_PERMISSION: i32 = 1154002;
pub const EID_ROLE_INSUFFICIENT_PERMISSION: i32 = 1154003;
pub const EID_EMAIL_INSUFFICIENT_PERMISSION: i32 = 1154004;
pub const EID_ACCESS_DENIED: i32 = 1154005;
pub const EID_INSUFFICIENT_SCOPE: i32 = 1154006;
pub const EID_UNABLE_VALIDATE_PERMISSION: i32 = 1155001;
pub const EID_UNABLE_VALIDATE_ROLE: i32 = 1155002;
pub const EID_UNABLE_VALIDATE_EMAIL_STATUS: i32 = 1155003;

const INSUFFICIENT_PERMISSION: &str = "access forbidden: insufficient permission";

/// Extra checks applied after the token has been validated, in order
#[derive(Debug, Clone)]
pub enum FilterOption {
    /// Token must belong to a user, not a client
    ValidUser,
    /// Token must grant the permission; `{namespace}` and `{userId}` are
    /// taken from the path parameters
    Permission(Permission),
    Role(String),
    VerifiedEmail,
    ValidAudience,
    ValidScope(String),
}

impl FilterOption {
    pub fn permission(resource: impl Into<String>, action: u32) -> Self {
        Self::Permission(Permission::new(resource, action))
    }
}

/// Creates auth guards sharing one validator
#[derive(Clone)]
pub struct AuthFilter {
    validator: Arc<dyn TokenValidator>,
    dev_stack_traceable: bool,
}

impl AuthFilter {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            dev_stack_traceable: false,
        }
    }

    /// Include the required permission in insufficient permission messages
    pub fn with_dev_stack_traceable(mut self, enabled: bool) -> Self {
        self.dev_stack_traceable = enabled;
        self
    }

    /// Guard rejecting requests without a valid token or failing an option
    pub fn auth(&self, options: Vec<FilterOption>) -> AuthGuard {
        self.guard(options, AuthMode::Required)
    }

    /// Guard that lets unauthenticated requests through without claims
    pub fn public_auth(&self, options: Vec<FilterOption>) -> AuthGuard {
        self.guard(options, AuthMode::Public)
    }

    fn guard(&self, options: Vec<FilterOption>, mode: AuthMode) -> AuthGuard {
        AuthGuard {
            filter: self.clone(),
            options: Arc::from(options),
            mode,
        }
    }

    async fn check(
        &self,
        option: &FilterOption,
        claims: &JwtClaims,
        path_params: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        match option {
            FilterOption::ValidUser => {
                if claims.subject().is_empty() {
                    return Err(ApiError::forbidden(
                        EID_NON_USER_ACCESS_TOKEN,
                        "access forbidden: non user access token",
                    ));
                }
            }
            FilterOption::Permission(permission) => {
                let mut resources = HashMap::new();
                for name in ["namespace", "userId"] {
                    resources.insert(
                        format!("{{{}}}", name),
                        path_params.get(name).cloned().unwrap_or_default(),
                    );
                }

                let valid = self
                    .validator
                    .validate_permission(claims, permission, &resources)
                    .await
                    .map_err(|e| {
                        ApiError::internal(
                            EID_UNABLE_VALIDATE_PERMISSION,
                            format!("unable to validate permission: {}", e),
                        )
                    })?;

                if !valid {
                    let message = if self.dev_stack_traceable {
                        format!(
                            "{}. Required permission: {} [{}]",
                            INSUFFICIENT_PERMISSION,
                            permission.resource,
                            permission.action_name()
                        )
                    } else {
                        INSUFFICIENT_PERMISSION.to_string()
                    };
                    return Err(ApiError::forbidden(EID_INSUFFICIENT_PERMISSION, message));
                }
            }
            FilterOption::Role(role) => {
                let valid = self.validator.validate_role(role, claims).await.map_err(|e| {
                    ApiError::internal(
                        EID_UNABLE_VALIDATE_ROLE,
                        format!("unable to validate role: {}", e),
                    )
                })?;
                if !valid {
                    return Err(ApiError::forbidden(
                        EID_ROLE_INSUFFICIENT_PERMISSION,
                        INSUFFICIENT_PERMISSION,
                    ));
                }
            }
            FilterOption::VerifiedEmail => {
                let verified = self
                    .validator
                    .user_email_verification_status(claims)
                    .await
                    .map_err(|e| {
                        ApiError::internal(
                            EID_UNABLE_VALIDATE_EMAIL_STATUS,
                            format!("unable to validate email status: {}", e),
                        )
                    })?;
                if !verified {
                    return Err(ApiError::forbidden(
                        EID_EMAIL_INSUFFICIENT_PERMISSION,
                        INSUFFICIENT_PERMISSION,
                    ));
                }
            }
            FilterOption::ValidAudience => {
                if let Err(e) = self.validator.validate_audience(claims).await {
                    debug!("Audience rejected: {}", e);
                    return Err(ApiError::forbidden(EID_ACCESS_DENIED, "access_denied"));
                }
            }
            FilterOption::ValidScope(scope) => {
                if let Err(e) = self.validator.validate_scope(claims, scope).await {
                    debug!("Scope rejected: {}", e);
                    return Err(ApiError::forbidden(EID_INSUFFICIENT_SCOPE, "insufficient_scope"));
                }
            }
        }

        Ok(())
    }

    async fn check_all(
        &self,
        options: &[FilterOption],
        claims: &JwtClaims,
        path_params: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        for option in options {
            self.check(option, claims, path_params).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    Required,
    Public,
}

/// Per-route auth state produced by [`AuthFilter::auth`] or [`AuthFilter::public_auth`]
#[derive(Clone)]
pub struct AuthGuard {
    filter: AuthFilter,
    options: Arc<[FilterOption]>,
    mode: AuthMode,
}

/// Token from the bearer header, falling back to the `access_token` cookie
pub fn parse_access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Claims stored by the auth filter, `None` for unauthenticated requests
pub fn retrieve_jwt_claims(request: &Request) -> Option<&JwtClaims> {
    request.extensions().get::<JwtClaims>()
}

/// Auth middleware; use with `from_fn_with_state(guard, authenticate)` as a route layer
pub async fn authenticate(
    State(guard): State<AuthGuard>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let path_params: HashMap<String, String> = match parts.extract::<RawPathParams>().await {
        Ok(params) => params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(_) => HashMap::new(),
    };
    let mut request = Request::from_parts(parts, body);
    let attributes = RequestAttributes::ensure(request.extensions_mut());

    let public = guard.mode == AuthMode::Public;

    let Some(token) = parse_access_token(request.headers()) else {
        if public {
            return next.run(request).await;
        }
        warn!("unauthorized access: token not provided in request header");
        return ApiError::unauthorized().into_response();
    };

    let claims = match guard.filter.validator.validate_and_parse_claims(&token).await {
        Ok(claims) => claims,
        Err(e) if public => {
            warn!("unauthorized access for public endpoint: {}", e);
            return next.run(request).await;
        }
        Err(e) => {
            warn!("unauthorized access: {}", e);
            let error = if e.is_expired() {
                ApiError::token_expired()
            } else {
                ApiError::unauthorized()
            };
            return error.into_response();
        }
    };

    if let Err(e) = guard
        .filter
        .check_all(&guard.options, &claims, &path_params)
        .await
    {
        warn!("{}", e.response.error_message);
        if public {
            return next.run(request).await;
        }
        return e.into_response();
    }

    attributes.set_claims(Some(claims.clone()));
    request.extensions_mut().insert(claims);

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::error::{TOKEN_IS_EXPIRED, UNAUTHORIZED_ACCESS};
    use crate::api::types::ErrorResponse;
    use crate::domain::auth::{MockTokenValidator, ACTION_READ};
    use crate::domain::DomainError;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn user_claims() -> JwtClaims {
        JwtClaims {
            sub: "user-1".to_string(),
            namespace: "ns".to_string(),
            client_id: "client-1".to_string(),
            exp: i64::MAX,
            ..Default::default()
        }
    }

    async fn whoami(request: Request) -> String {
        retrieve_jwt_claims(&request)
            .map(|claims| claims.sub.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(filter: AuthFilter, guard: impl Fn(&AuthFilter) -> AuthGuard) -> Router {
        let guard = guard(&filter);
        Router::new().route(
            "/v1/namespaces/{namespace}/users/{userId}",
            get(whoami).route_layer(middleware::from_fn_with_state(guard, authenticate)),
        )
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/v1/namespaces/ns/users/user-1");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn accepting_validator(claims: JwtClaims) -> MockTokenValidator {
        let mut validator = MockTokenValidator::new();
        validator
            .expect_validate_and_parse_claims()
            .returning(move |_| Ok(claims.clone()));
        validator
    }

    #[test]
    fn test_parse_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(parse_access_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(parse_access_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(parse_access_token(&headers), None);
    }

    #[test]
    fn test_parse_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; access_token=cookie.jwt".parse().unwrap());
        assert_eq!(parse_access_token(&headers).as_deref(), Some("cookie.jwt"));

        headers.insert(header::COOKIE, "access_token=".parse().unwrap());
        assert_eq!(parse_access_token(&headers), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let filter = AuthFilter::new(Arc::new(MockTokenValidator::new()));
        let response = app(filter, |f| f.auth(vec![])).oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = error_body(response).await;
        assert_eq!(body.error_code, UNAUTHORIZED_ACCESS);
        assert_eq!(body.error_message, "unauthorized access");
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut validator = MockTokenValidator::new();
        validator
            .expect_validate_and_parse_claims()
            .returning(|_| Err(DomainError::TokenExpired));
        let filter = AuthFilter::new(Arc::new(validator));

        let response = app(filter, |f| f.auth(vec![]))
            .oneshot(request(Some("Bearer old")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = error_body(response).await;
        assert_eq!(body.error_code, TOKEN_IS_EXPIRED);
        assert_eq!(body.error_message, "token is expired");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let filter = AuthFilter::new(Arc::new(accepting_validator(user_claims())));
        let response = app(filter, |f| f.auth(vec![FilterOption::ValidUser]))
            .oneshot(request(Some("Bearer good")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text_body(response).await, "user-1");
    }

    #[tokio::test]
    async fn test_client_token_rejected_by_valid_user() {
        let mut claims = user_claims();
        claims.sub = String::new();
        let filter = AuthFilter::new(Arc::new(accepting_validator(claims)));

        let response = app(filter, |f| f.auth(vec![FilterOption::ValidUser]))
            .oneshot(request(Some("Bearer client")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = error_body(response).await;
        assert_eq!(body.error_code, EID_NON_USER_ACCESS_TOKEN);
    }

    #[tokio::test]
    async fn test_permission_uses_path_params() {
        let mut validator = accepting_validator(user_claims());
        validator
            .expect_validate_permission()
            .withf(|_, permission, resources| {
                permission.resource == "NAMESPACE:{namespace}:USER:{userId}"
                    && resources.get("{namespace}").map(String::as_str) == Some("ns")
                    && resources.get("{userId}").map(String::as_str) == Some("user-1")
            })
            .returning(|_, _, _| Ok(true));
        let filter = AuthFilter::new(Arc::new(validator));

        let response = app(filter, |f| {
            f.auth(vec![FilterOption::permission(
                "NAMESPACE:{namespace}:USER:{userId}",
                ACTION_READ,
            )])
        })
        .oneshot(request(Some("Bearer good")))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_insufficient_permission_messages() {
        for (traceable, expected) in [
            (false, "access forbidden: insufficient permission".to_string()),
            (
                true,
                "access forbidden: insufficient permission. Required permission: NAMESPACE:{namespace}:USER:{userId} [READ]"
                    .to_string(),
            ),
        ] {
            let mut validator = accepting_validator(user_claims());
            validator
                .expect_validate_permission()
                .returning(|_, _, _| Ok(false));
            let filter = AuthFilter::new(Arc::new(validator)).with_dev_stack_traceable(traceable);

            let response = app(filter, |f| {
                f.auth(vec![FilterOption::permission(
                    "NAMESPACE:{namespace}:USER:{userId}",
                    ACTION_READ,
                )])
            })
            .oneshot(request(Some("Bearer good")))
            .await
            .unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            let body = error_body(response).await;
            assert_eq!(body.error_code, EID_INSUFFICIENT_PERMISSION);
            assert_eq!(body.error_message, expected);
        }
    }

    #[tokio::test]
    async fn test_permission_validation_error() {
        let mut validator = accepting_validator(user_claims());
        validator
            .expect_validate_permission()
            .returning(|_, _, _| Err(DomainError::internal("iam unavailable")));
        let filter = AuthFilter::new(Arc::new(validator));

        let response = app(filter, |f| f.auth(vec![FilterOption::permission("ADMIN", ACTION_READ)]))
            .oneshot(request(Some("Bearer good")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_body(response).await.error_code, EID_UNABLE_VALIDATE_PERMISSION);
    }

    #[tokio::test]
    async fn test_role_email_audience_scope_codes() {
        let cases: Vec<(FilterOption, StatusCode, i32)> = vec![
            (FilterOption::Role("admin".to_string()), StatusCode::FORBIDDEN, EID_ROLE_INSUFFICIENT_PERMISSION),
            (FilterOption::VerifiedEmail, StatusCode::FORBIDDEN, EID_EMAIL_INSUFFICIENT_PERMISSION),
            (FilterOption::ValidAudience, StatusCode::FORBIDDEN, EID_ACCESS_DENIED),
            (FilterOption::ValidScope("commerce".to_string()), StatusCode::FORBIDDEN, EID_INSUFFICIENT_SCOPE),
        ];

        for (option, status, code) in cases {
            let mut validator = accepting_validator(user_claims());
            validator.expect_validate_role().returning(|_, _| Ok(false));
            validator
                .expect_user_email_verification_status()
                .returning(|_| Ok(false));
            validator
                .expect_validate_audience()
                .returning(|_| Err(DomainError::unauthorized("audience is not valid")));
            validator
                .expect_validate_scope()
                .returning(|_, _| Err(DomainError::unauthorized("insufficient scope")));
            let filter = AuthFilter::new(Arc::new(validator));

            let response = app(filter, move |f| f.auth(vec![option.clone()]))
                .oneshot(request(Some("Bearer good")))
                .await
                .unwrap();

            assert_eq!(response.status(), status);
            assert_eq!(error_body(response).await.error_code, code);
        }
    }

    #[tokio::test]
    async fn test_public_auth_without_token() {
        let filter = AuthFilter::new(Arc::new(MockTokenValidator::new()));
        let response = app(filter, |f| f.public_auth(vec![]))
            .oneshot(request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text_body(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_public_auth_with_invalid_token() {
        let mut validator = MockTokenValidator::new();
        validator
            .expect_validate_and_parse_claims()
            .returning(|_| Err(DomainError::unauthorized("bad signature")));
        let filter = AuthFilter::new(Arc::new(validator));

        let response = app(filter, |f| f.public_auth(vec![]))
            .oneshot(request(Some("Bearer bad")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text_body(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_public_auth_drops_claims_on_failed_option() {
        let mut claims = user_claims();
        claims.sub = String::new();
        let filter = AuthFilter::new(Arc::new(accepting_validator(claims)));

        let response = app(filter, |f| f.public_auth(vec![FilterOption::ValidUser]))
            .oneshot(request(Some("Bearer client")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text_body(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_public_auth_with_valid_token() {
        let filter = AuthFilter::new(Arc::new(accepting_validator(user_claims())));
        let response = app(filter, |f| f.public_auth(vec![FilterOption::ValidUser]))
            .oneshot(request(Some("Bearer good")))
            .await
            .unwrap();

        assert_eq!(text_body(response).await, "user-1");
    }
}
