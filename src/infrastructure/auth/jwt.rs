//! JWT validation with shared secret or JWKS keys

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, info};

use super::uri::get_domain;
use crate::config::AuthConfig;
use crate::domain::auth::{JwtClaims, Permission, TokenValidator};
use crate::domain::DomainError;

/// JWK entry; only public key material is read
#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    /// Key type (RSA, oct)
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    /// RSA modulus (base64url)
    n: Option<String>,
    /// RSA public exponent (base64url)
    e: Option<String>,
    /// Symmetric key value (base64url)
    k: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwks {
    keys: Vec<JwkKey>,
}

#[derive(Clone)]
struct VerificationKey {
    kid: Option<String>,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

/// Token validator backed by local verification keys.
///
/// Authorization checks are answered from the token's own claims.
#[derive(Clone)]
pub struct JwtTokenValidator {
    keys: Vec<VerificationKey>,
    client_base_uri: Option<String>,
}

impl Debug for JwtTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kids: Vec<_> = self.keys.iter().map(|k| (&k.kid, k.algorithm)).collect();
        f.debug_struct("JwtTokenValidator")
            .field("keys", &kids)
            .field("client_base_uri", &self.client_base_uri)
            .finish()
    }
}

impl JwtTokenValidator {
    /// HS256 validator for a shared secret
    pub fn from_secret(secret: &str) -> Self {
        Self {
            keys: vec![VerificationKey {
                kid: None,
                algorithm: Algorithm::HS256,
                decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            }],
            client_base_uri: None,
        }
    }

    /// Validator for every usable key in a JWKS document
    pub fn from_jwks_json(jwks_json: &str) -> Result<Self, DomainError> {
        let jwks: Jwks = serde_json::from_str(jwks_json)
            .map_err(|e| DomainError::validation(format!("Failed to parse JWKS: {}", e)))?;

        if jwks.keys.is_empty() {
            return Err(DomainError::validation("JWKS contains no keys"));
        }

        let keys = jwks
            .keys
            .iter()
            .map(verification_key)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keys,
            client_base_uri: None,
        })
    }

    /// Fetch the JWKS document from the issuer
    pub async fn from_jwks_url(url: &str) -> Result<Self, DomainError> {
        let body = reqwest::get(url)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| DomainError::provider("jwks", e.to_string()))?
            .text()
            .await
            .map_err(|e| DomainError::provider("jwks", e.to_string()))?;

        let validator = Self::from_jwks_json(&body)?;
        info!(url = %url, keys = validator.keys.len(), "Loaded JWKS");

        Ok(validator)
    }

    /// Build from configuration: JWKS URL first, then shared secret
    pub async fn from_config(config: &AuthConfig) -> Result<Self, DomainError> {
        let validator = match (&config.jwks_url, &config.jwt_secret) {
            (Some(url), _) => Self::from_jwks_url(url).await?,
            (None, Some(secret)) => Self::from_secret(secret),
            (None, None) => {
                return Err(DomainError::configuration(
                    "either auth.jwks_url or auth.jwt_secret must be set",
                ))
            }
        };

        Ok(match &config.client_base_uri {
            Some(uri) => validator.with_client_base_uri(uri),
            None => validator,
        })
    }

    /// Base URI whose domain must appear in the token audience
    pub fn with_client_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.client_base_uri = Some(uri.into());
        self
    }

    fn select_key(&self, kid: Option<&str>, algorithm: Algorithm) -> Option<&VerificationKey> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.kid.as_deref() == Some(kid))
                .or_else(|| self.keys.iter().find(|k| k.kid.is_none() && k.algorithm == algorithm)),
            None => self.keys.iter().find(|k| k.algorithm == algorithm),
        }
    }
}

fn verification_key(key: &JwkKey) -> Result<VerificationKey, DomainError> {
    match key.kty.as_str() {
        "RSA" => {
            let algorithm = match key.alg.as_deref() {
                Some("RS256") | None => Algorithm::RS256,
                Some("RS384") => Algorithm::RS384,
                Some("RS512") => Algorithm::RS512,
                Some(alg) => {
                    return Err(DomainError::validation(format!(
                        "Unsupported RSA algorithm: {}",
                        alg
                    )))
                }
            };
            let n = key
                .n
                .as_deref()
                .ok_or_else(|| DomainError::validation("RSA key missing 'n' (modulus)"))?;
            let e = key
                .e
                .as_deref()
                .ok_or_else(|| DomainError::validation("RSA key missing 'e' (public exponent)"))?;
            let decoding_key = DecodingKey::from_rsa_components(n, e)
                .map_err(|e| DomainError::validation(format!("Invalid RSA key: {}", e)))?;

            Ok(VerificationKey {
                kid: key.kid.clone(),
                algorithm,
                decoding_key,
            })
        }
        "oct" => {
            let algorithm = match key.alg.as_deref() {
                Some("HS256") | None => Algorithm::HS256,
                Some("HS384") => Algorithm::HS384,
                Some("HS512") => Algorithm::HS512,
                Some(alg) => {
                    return Err(DomainError::validation(format!(
                        "Unsupported symmetric algorithm: {}",
                        alg
                    )))
                }
            };
            let k = key
                .k
                .as_deref()
                .ok_or_else(|| DomainError::validation("Symmetric key missing 'k' value"))?;
            let secret = URL_SAFE_NO_PAD.decode(k).map_err(|e| {
                DomainError::validation(format!("Invalid base64url in JWK 'k': {}", e))
            })?;

            Ok(VerificationKey {
                kid: key.kid.clone(),
                algorithm,
                decoding_key: DecodingKey::from_secret(&secret),
            })
        }
        other => Err(DomainError::validation(format!(
            "Unsupported key type: {}. Use RSA or oct.",
            other
        ))),
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate_and_parse_claims(&self, token: &str) -> Result<JwtClaims, DomainError> {
        let header = decode_header(token)
            .map_err(|e| DomainError::unauthorized(format!("Invalid JWT header: {}", e)))?;

        let key = self
            .select_key(header.kid.as_deref(), header.alg)
            .ok_or_else(|| DomainError::unauthorized("no verification key for token"))?;

        let mut validation = Validation::new(key.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;

        decode::<JwtClaims>(token, &key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::TokenExpired,
                _ => DomainError::unauthorized(format!("Invalid JWT: {}", e)),
            })
    }

    async fn validate_permission(
        &self,
        claims: &JwtClaims,
        permission: &Permission,
        resources: &HashMap<String, String>,
    ) -> Result<bool, DomainError> {
        let required = permission.resolve(resources);
        let granted = claims.permissions.iter().any(|held| held.grants(&required));

        debug!(
            resource = %required.resource,
            action = required.action,
            granted,
            "Permission checked"
        );

        Ok(granted)
    }

    async fn validate_role(&self, role_id: &str, claims: &JwtClaims) -> Result<bool, DomainError> {
        Ok(claims.has_role(role_id))
    }

    async fn user_email_verification_status(
        &self,
        claims: &JwtClaims,
    ) -> Result<bool, DomainError> {
        Ok(claims.email_verified)
    }

    async fn validate_audience(&self, claims: &JwtClaims) -> Result<(), DomainError> {
        // Tokens without an audience are not audience-restricted
        if claims.aud.is_empty() {
            return Ok(());
        }

        let base_uri = self
            .client_base_uri
            .as_deref()
            .ok_or_else(|| DomainError::configuration("client base URI is not configured"))?;
        let domain = get_domain(base_uri);

        if claims.aud.iter().any(|aud| aud == domain) {
            Ok(())
        } else {
            Err(DomainError::unauthorized("audience is not valid"))
        }
    }

    async fn validate_scope(&self, claims: &JwtClaims, scope: &str) -> Result<(), DomainError> {
        if claims.has_scope(scope) {
            Ok(())
        } else {
            Err(DomainError::unauthorized("insufficient scope"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::{ACTION_READ, ACTION_UPDATE};
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret-key-12345";

    fn claims(sub: &str) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: sub.to_string(),
            namespace: "accelbyte".to_string(),
            client_id: "client-1".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            ..Default::default()
        }
    }

    fn sign(claims: &JwtClaims, header: &Header, secret: &[u8]) -> String {
        encode(header, claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn jwks_for_secret(kid: &str, secret: &str) -> String {
        format!(
            r#"{{"keys":[{{"kty":"oct","kid":"{}","alg":"HS256","k":"{}"}}]}}"#,
            kid,
            URL_SAFE_NO_PAD.encode(secret)
        )
    }

    #[tokio::test]
    async fn test_secret_round_trip() {
        let validator = JwtTokenValidator::from_secret(SECRET);
        let token = sign(&claims("user-1"), &Header::default(), SECRET.as_bytes());

        let parsed = validator.validate_and_parse_claims(&token).await.unwrap();
        assert_eq!(parsed.sub, "user-1");
        assert_eq!(parsed.namespace, "accelbyte");
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let validator = JwtTokenValidator::from_secret("secret-1");
        let token = sign(&claims("user-1"), &Header::default(), b"secret-2");

        let err = validator.validate_and_parse_claims(&token).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let validator = JwtTokenValidator::from_secret(SECRET);
        let mut expired = claims("user-1");
        expired.exp = (Utc::now() - Duration::minutes(5)).timestamp();
        let token = sign(&expired, &Header::default(), SECRET.as_bytes());

        let err = validator.validate_and_parse_claims(&token).await.unwrap_err();
        assert!(err.is_expired());
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let validator = JwtTokenValidator::from_secret(SECRET);
        assert!(validator.validate_and_parse_claims("not-a-jwt").await.is_err());
    }

    #[test]
    fn test_jwks_invalid_json() {
        assert!(JwtTokenValidator::from_jwks_json("not valid json").is_err());
    }

    #[test]
    fn test_jwks_empty_keys() {
        assert!(JwtTokenValidator::from_jwks_json(r#"{"keys": []}"#).is_err());
    }

    #[test]
    fn test_jwks_unsupported_key_type() {
        let result = JwtTokenValidator::from_jwks_json(r#"{"keys":[{"kty":"EC","kid":"x"}]}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_jwks_oct_key_selected_by_kid() {
        let validator = JwtTokenValidator::from_jwks_json(&jwks_for_secret("key-1", SECRET)).unwrap();

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("key-1".to_string());
        let token = sign(&claims("user-1"), &header, SECRET.as_bytes());

        let parsed = validator.validate_and_parse_claims(&token).await.unwrap();
        assert_eq!(parsed.sub, "user-1");

        header.kid = Some("unknown".to_string());
        let token = sign(&claims("user-1"), &header, SECRET.as_bytes());
        assert!(validator.validate_and_parse_claims(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_jwks_fetched_from_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iam/v3/oauth/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_string(jwks_for_secret("k1", SECRET)))
            .mount(&server)
            .await;

        let config = AuthConfig {
            jwks_url: Some(format!("{}/iam/v3/oauth/jwks", server.uri())),
            client_base_uri: Some("https://game.example.net/app".to_string()),
            ..Default::default()
        };
        let validator = JwtTokenValidator::from_config(&config).await.unwrap();

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let token = sign(&claims("user-1"), &header, SECRET.as_bytes());

        assert!(validator.validate_and_parse_claims(&token).await.is_ok());
        assert_eq!(
            validator.client_base_uri.as_deref(),
            Some("https://game.example.net/app")
        );
    }

    #[tokio::test]
    async fn test_jwks_url_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = JwtTokenValidator::from_jwks_url(&format!("{}/jwks", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_config_without_keys() {
        let err = JwtTokenValidator::from_config(&AuthConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_validate_permission_with_placeholders() {
        let validator = JwtTokenValidator::from_secret(SECRET);
        let mut user = claims("user-1");
        user.permissions = vec![Permission::new("NAMESPACE:accelbyte:USER:*", ACTION_READ)];

        let mut resources = HashMap::new();
        resources.insert("{namespace}".to_string(), "accelbyte".to_string());
        resources.insert("{userId}".to_string(), "user-1".to_string());

        let read = Permission::new("NAMESPACE:{namespace}:USER:{userId}", ACTION_READ);
        let update = Permission::new("NAMESPACE:{namespace}:USER:{userId}", ACTION_UPDATE);

        assert!(validator.validate_permission(&user, &read, &resources).await.unwrap());
        assert!(!validator.validate_permission(&user, &update, &resources).await.unwrap());
    }

    #[tokio::test]
    async fn test_validate_audience() {
        let validator =
            JwtTokenValidator::from_secret(SECRET).with_client_base_uri("https://game.example.net/app");

        let mut user = claims("user-1");
        assert!(validator.validate_audience(&user).await.is_ok());

        user.aud = vec!["https://game.example.net".to_string()];
        assert!(validator.validate_audience(&user).await.is_ok());

        user.aud = vec!["https://other.example.net".to_string()];
        assert!(validator.validate_audience(&user).await.is_err());
    }

    #[tokio::test]
    async fn test_validate_scope_role_and_email() {
        let validator = JwtTokenValidator::from_secret(SECRET);
        let mut user = claims("user-1");
        user.scope = "account commerce".to_string();
        user.roles = vec!["role-admin".to_string()];

        assert!(validator.validate_scope(&user, "commerce").await.is_ok());
        assert!(validator.validate_scope(&user, "social").await.is_err());
        assert!(validator.validate_role("role-admin", &user).await.unwrap());
        assert!(!validator.user_email_verification_status(&user).await.unwrap());
    }
}
