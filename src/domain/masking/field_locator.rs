//! Field locator - compiled JSON and form matchers per field name
//!
//! A [`FieldMatcher`] knows how to find one field inside JSON and
//! `key=value` (form / query string) content. Matchers are built lazily and
//! cached by the locator so every request reuses the same compiled patterns.

use std::fmt;
use std::sync::Arc;

use moka::sync::Cache;
use regex::{Captures, Regex};
use tracing::warn;

/// Value captured by a JSON match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonValue<'a> {
    /// Quoted scalar, surrounding quotes removed
    Scalar(&'a str),
    /// Bracketed list, surrounding brackets removed
    Array(&'a str),
}

/// Compiled lookup rules for a single field name
pub struct FieldMatcher {
    field_name: String,
    json_pattern: Regex,
    form_pattern: Regex,
}

impl fmt::Debug for FieldMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMatcher")
            .field("field_name", &self.field_name)
            .field("json_pattern", &self.json_pattern.as_str())
            .field("form_pattern", &self.form_pattern.as_str())
            .finish()
    }
}

impl FieldMatcher {
    /// Build both patterns for `field_name`. The name is matched literally.
    pub fn new(field_name: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(field_name);

        // "field":"scalar" or "field":[...]; the separator is kept verbatim
        let json_pattern = Regex::new(&format!(
            r#""{escaped}"(\s*:\s*)(\[[^\]]*\]|"(?:[^"\\]|\\.)*")"#
        ))?;
        // field=value up to the next '&' or end of input
        let form_pattern = Regex::new(&format!(r"{escaped}=([^&]*)"))?;

        Ok(Self {
            field_name: field_name.to_string(),
            json_pattern,
            form_pattern,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn matches_json(&self, content: &str) -> bool {
        self.json_pattern.is_match(content)
    }

    pub fn matches_form(&self, content: &str) -> bool {
        self.form_pattern.is_match(content)
    }

    /// Replace every JSON occurrence of the field.
    ///
    /// `rewrite` receives the matched value and returns the raw JSON text
    /// (quotes or brackets included) to put in its place.
    pub fn replace_json<F>(&self, content: &str, mut rewrite: F) -> String
    where
        F: FnMut(JsonValue<'_>) -> String,
    {
        self.json_pattern
            .replace_all(content, |caps: &Captures<'_>| {
                let separator = &caps[1];
                let raw = &caps[2];
                let value = if raw.starts_with('[') {
                    JsonValue::Array(&raw[1..raw.len() - 1])
                } else {
                    JsonValue::Scalar(&raw[1..raw.len() - 1])
                };

                format!("\"{}\"{}{}", self.field_name, separator, rewrite(value))
            })
            .into_owned()
    }

    /// Replace every `field=value` occurrence; `rewrite` returns the new value.
    pub fn replace_form<F>(&self, content: &str, mut rewrite: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        self.form_pattern
            .replace_all(content, |caps: &Captures<'_>| {
                format!("{}={}", self.field_name, rewrite(&caps[1]))
            })
            .into_owned()
    }
}

/// Maps a field name to its compiled matcher
pub trait FieldLocator: Send + Sync {
    /// Get the cached matcher for `field_name`, building it on first use.
    ///
    /// Returns `None` only when no matcher can be built for the name; the
    /// caller treats that field as absent.
    fn matcher(&self, field_name: &str) -> Option<Arc<FieldMatcher>>;
}

/// Regex-backed locator with an unbounded concurrent cache
pub struct RegexFieldLocator {
    cache: Cache<String, Arc<FieldMatcher>>,
}

impl RegexFieldLocator {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Number of field names compiled so far
    pub fn cached_len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for RegexFieldLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldLocator for RegexFieldLocator {
    fn matcher(&self, field_name: &str) -> Option<Arc<FieldMatcher>> {
        // Concurrent first use of a name runs a single build; the other
        // callers wait for it and share the result.
        self.cache
            .try_get_with_by_ref(field_name, || FieldMatcher::new(field_name).map(Arc::new))
            .map_err(|e| {
                warn!(field = %field_name, error = %e, "Unable to build field matcher");
            })
            .ok()
    }
}
