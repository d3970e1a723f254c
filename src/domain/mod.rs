//! Domain layer - masking, authorization and event types

pub mod auth;
pub mod error;
pub mod event;
pub mod masking;

pub use error::DomainError;
pub use event::{Event, EventLevel, EventLog};
pub use masking::{MaskStrategy, MaskingEngine};
