//! Token validation infrastructure
//!
//! Access tokens are verified against a shared secret or JWKS keys.

mod jwt;
mod uri;

pub use jwt::JwtTokenValidator;
pub use uri::get_domain;
