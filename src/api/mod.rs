//! API layer - filters, demo endpoints and response helpers

pub mod health;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;
pub mod types;
pub mod v1;

pub use router::create_router;
pub use state::AppState;
