//! Token validator trait

use std::collections::HashMap;

use async_trait::async_trait;

use super::{JwtClaims, Permission};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Validates access tokens and the authorization questions asked about them
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Verifies the token and returns its claims
    async fn validate_and_parse_claims(&self, token: &str) -> Result<JwtClaims, DomainError>;

    /// Checks `permission` after substituting `resources` placeholders
    async fn validate_permission(
        &self,
        claims: &JwtClaims,
        permission: &Permission,
        resources: &HashMap<String, String>,
    ) -> Result<bool, DomainError>;

    async fn validate_role(&self, role_id: &str, claims: &JwtClaims) -> Result<bool, DomainError>;

    async fn user_email_verification_status(&self, claims: &JwtClaims)
        -> Result<bool, DomainError>;

    async fn validate_audience(&self, claims: &JwtClaims) -> Result<(), DomainError>;

    async fn validate_scope(&self, claims: &JwtClaims, scope: &str) -> Result<(), DomainError>;
}
