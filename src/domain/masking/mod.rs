//! Sensitive-field masking for access logs
//!
//! Field values are located by name in JSON, form-urlencoded or unknown
//! content (JSON first, then form) and replaced either fully (`******`) or
//! partially, revealing a prefix (`****` suffix, email-aware).

mod engine;
mod field_locator;
mod partial;

pub use engine::{ContentKind, MaskStrategy, MaskingEngine, MASKED_VALUE};
pub use field_locator::{FieldLocator, FieldMatcher, JsonValue, RegexFieldLocator};
pub use partial::{
    mask_last_n_chars, query_unescape, UnescapeError, DEFAULT_MASK_CHARS_COUNT, PII_MASK,
};
