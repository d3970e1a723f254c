//! JWT claims carried by authenticated requests

use serde::{Deserialize, Deserializer, Serialize};

use super::permission::Permission;

/// Claims extracted from a validated access token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID); empty for client tokens
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Space separated scopes
    #[serde(default)]
    pub scope: String,
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope)
    }
}

/// `aud` may be a single string or a list
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Audience::deserialize(deserializer)? {
        Audience::One(aud) => vec![aud],
        Audience::Many(aud) => aud,
    })
}
