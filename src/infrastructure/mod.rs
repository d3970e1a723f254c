//! Infrastructure layer - token validation, log output, observability

pub mod auth;
pub mod json;
pub mod logging;
pub mod observability;
