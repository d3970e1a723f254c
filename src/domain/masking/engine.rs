//! Masking engine - rewrites sensitive field values in bodies and URIs

use std::sync::Arc;

use tracing::warn;

use super::field_locator::{FieldLocator, FieldMatcher, JsonValue, RegexFieldLocator};
use super::partial::{mask_last_n_chars, query_unescape, DEFAULT_MASK_CHARS_COUNT};

/// Replacement for fully masked values
pub const MASKED_VALUE: &str = "******";

/// How matched values are rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    /// Replace the whole value with [`MASKED_VALUE`]
    Full,
    /// Keep a recognizable prefix, hide the tail
    Pii,
}

/// Content shape derived from a `Content-Type` header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Form,
    /// Try JSON first, then form
    Unknown,
}

impl ContentKind {
    pub fn classify(content_type: &str) -> Self {
        if content_type.contains("application/json") {
            Self::Json
        } else if content_type.contains("application/x-www-form-urlencoded") {
            Self::Form
        } else {
            Self::Unknown
        }
    }
}

/// Masks field values in request/response bodies and query strings.
///
/// `fields` arguments are comma-separated field names. Names are applied in
/// order; names that do not occur in the content are skipped.
#[derive(Clone)]
pub struct MaskingEngine {
    locator: Arc<dyn FieldLocator>,
}

impl MaskingEngine {
    /// Engine backed by its own [`RegexFieldLocator`]
    pub fn new() -> Self {
        Self::with_locator(Arc::new(RegexFieldLocator::new()))
    }

    pub fn with_locator(locator: Arc<dyn FieldLocator>) -> Self {
        Self { locator }
    }

    /// Fully mask `fields` in a body
    pub fn mask_fields(&self, content_type: &str, content: &str, fields: &str) -> String {
        self.mask_content(content_type, content, fields, MaskStrategy::Full)
    }

    /// Partially mask `fields` in a body
    pub fn mask_pii_fields(&self, content_type: &str, content: &str, fields: &str) -> String {
        self.mask_content(content_type, content, fields, MaskStrategy::Pii)
    }

    /// Fully mask query parameters in a URI
    pub fn mask_query_params(&self, uri: &str, fields: &str) -> String {
        self.mask_query(uri, fields, MaskStrategy::Full)
    }

    /// Partially mask query parameters in a URI.
    ///
    /// The URI is unescaped once before matching and is returned unescaped.
    pub fn mask_pii_query_params(&self, uri: &str, fields: &str) -> String {
        self.mask_query(uri, fields, MaskStrategy::Pii)
    }

    pub fn mask_content(
        &self,
        content_type: &str,
        content: &str,
        fields: &str,
        strategy: MaskStrategy,
    ) -> String {
        if content.is_empty() || fields.is_empty() {
            return content.to_string();
        }

        let kind = ContentKind::classify(content_type);
        let mut content = content.to_string();

        for matcher in self.matchers(fields) {
            content = match kind {
                ContentKind::Json => rewrite_json(&matcher, &content, strategy),
                ContentKind::Form => rewrite_form(&matcher, &content, strategy),
                ContentKind::Unknown => {
                    if matcher.matches_json(&content) {
                        rewrite_json(&matcher, &content, strategy)
                    } else if matcher.matches_form(&content) {
                        rewrite_form(&matcher, &content, strategy)
                    } else {
                        continue;
                    }
                }
            };
        }

        content
    }

    pub fn mask_query(&self, uri: &str, fields: &str, strategy: MaskStrategy) -> String {
        if uri.is_empty() || fields.is_empty() {
            return uri.to_string();
        }

        let mut uri = uri.to_string();
        if strategy == MaskStrategy::Pii {
            match query_unescape(&uri) {
                Ok(unescaped) => uri = unescaped,
                Err(e) => {
                    warn!(error = %e, "Failed to unescape URI for masking sensitive data");
                }
            }
        }

        for matcher in self.matchers(fields) {
            uri = rewrite_form(&matcher, &uri, strategy);
        }

        uri
    }

    fn matchers<'a>(&'a self, fields: &'a str) -> impl Iterator<Item = Arc<FieldMatcher>> + 'a {
        fields
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| self.locator.matcher(name))
    }
}

impl Default for MaskingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_json(matcher: &FieldMatcher, content: &str, strategy: MaskStrategy) -> String {
    matcher.replace_json(content, |value| match (strategy, value) {
        // Arrays collapse to a single masked string under full masking
        (MaskStrategy::Full, _) => format!("\"{}\"", MASKED_VALUE),
        (MaskStrategy::Pii, JsonValue::Scalar(scalar)) => {
            format!("\"{}\"", mask_last_n_chars(scalar, DEFAULT_MASK_CHARS_COUNT))
        }
        (MaskStrategy::Pii, JsonValue::Array(items)) => mask_json_array(items),
    })
}

fn mask_json_array(items: &str) -> String {
    if items.trim().is_empty() {
        return "[]".to_string();
    }

    let masked: Vec<String> = items
        .split(',')
        .map(|item| {
            let item = item.trim().trim_matches('"');
            format!("\"{}\"", mask_last_n_chars(item, DEFAULT_MASK_CHARS_COUNT))
        })
        .collect();

    format!("[{}]", masked.join(","))
}

fn rewrite_form(matcher: &FieldMatcher, content: &str, strategy: MaskStrategy) -> String {
    matcher.replace_form(content, |value| match strategy {
        MaskStrategy::Full => MASKED_VALUE.to_string(),
        MaskStrategy::Pii => mask_last_n_chars(value, DEFAULT_MASK_CHARS_COUNT),
    })
}
