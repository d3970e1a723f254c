//! Authentication domain - claims, permissions and the validator seam

mod claims;
mod permission;
mod validator;

pub use claims::JwtClaims;
pub use permission::{Permission, ACTION_CREATE, ACTION_DELETE, ACTION_READ, ACTION_UPDATE};
pub use validator::TokenValidator;

#[cfg(test)]
pub use validator::MockTokenValidator;
