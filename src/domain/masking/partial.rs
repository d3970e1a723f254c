//! Partial (PII) masking of single values

use thiserror::Error;
use tracing::warn;

/// Marker appended after the revealed prefix of a PII value
pub const PII_MASK: &str = "****";

/// Number of trailing characters hidden by PII masking
pub const DEFAULT_MASK_CHARS_COUNT: usize = 2;

/// Error raised when a value is not valid query-escaped text
#[derive(Debug, Error)]
pub enum UnescapeError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("unescaped value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Decode query-string escaping: `+` becomes a space and every `%` must be
/// followed by two hex digits.
///
/// Escapes that decode to invalid UTF-8 (`%ff`) are an error instead of
/// yielding raw bytes, since the result is a `String`.
pub fn query_unescape(value: &str) -> Result<String, UnescapeError> {
    let bytes = value.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                let escape = value.get(i..end).unwrap_or("%");
                return Err(UnescapeError::InvalidEscape(escape.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = value.replace('+', " ");
    Ok(urlencoding::decode(&spaced)?.into_owned())
}

/// Mask a value by hiding its last `n` characters.
///
/// The value is unquoted and query-unescaped first. Comma-separated values
/// are masked item by item, and email-like items only have their local part
/// masked.
pub fn mask_last_n_chars(value: &str, n: usize) -> String {
    if value.is_empty() {
        return String::new();
    }

    let value = if value.starts_with('"') {
        value.trim_matches('"')
    } else {
        value
    };

    let decoded = match query_unescape(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "Failed to unescape value for masking sensitive data");
            value.to_string()
        }
    };

    if decoded.contains(',') {
        decoded
            .split(',')
            .map(|item| mask_item(item, n))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        mask_item(&decoded, n)
    }
}

fn mask_item(value: &str, n: usize) -> String {
    if value.is_empty() {
        return String::new();
    }

    match value.split_once('@') {
        Some((local, domain)) => format!("{}{}@{}", revealed_prefix(local, n), PII_MASK, domain),
        None => format!("{}{}", revealed_prefix(value, n), PII_MASK),
    }
}

/// Characters left visible: all but the last `n`, or only the first one
/// when the value is `n` characters or shorter.
fn revealed_prefix(value: &str, n: usize) -> &str {
    let count = value.chars().count();
    let keep = if count <= n { 1 } else { count - n };

    match value.char_indices().nth(keep) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_value_keeps_first_char() {
        assert_eq!(mask_last_n_chars("us", 2), "u****");
        assert_eq!(mask_last_n_chars("u", 2), "u****");
    }

    #[test]
    fn test_long_value_hides_last_two() {
        assert_eq!(mask_last_n_chars("mypassword", 2), "mypasswo****");
    }

    #[test]
    fn test_email_masks_local_part_only() {
        assert_eq!(mask_last_n_chars("test@accelbyte.net", 2), "te****@accelbyte.net");
        assert_eq!(mask_last_n_chars("ab@accelbyte.net", 2), "a****@accelbyte.net");
    }

    #[test]
    fn test_email_with_empty_local_part() {
        assert_eq!(mask_last_n_chars("@accelbyte.net", 2), "****@accelbyte.net");
    }

    #[test]
    fn test_comma_separated_items() {
        assert_eq!(
            mask_last_n_chars("test1@accelbyte.net,test2@accelbyte.net", 2),
            "tes****@accelbyte.net,tes****@accelbyte.net"
        );
        assert_eq!(mask_last_n_chars("abc,", 2), "a****,");
    }

    #[test]
    fn test_quoted_value_is_unquoted() {
        assert_eq!(mask_last_n_chars("\"secret\"", 2), "secr****");
    }

    #[test]
    fn test_encoded_value_is_decoded() {
        assert_eq!(mask_last_n_chars("my%20username", 2), "my userna****");
        assert_eq!(mask_last_n_chars("my+username", 2), "my userna****");
    }

    #[test]
    fn test_undecodable_value_is_masked_raw() {
        assert_eq!(mask_last_n_chars("100%zz", 2), "100%****");
    }

    #[test]
    fn test_multibyte_characters() {
        assert_eq!(mask_last_n_chars("héllo", 2), "hél****");
        assert_eq!(mask_last_n_chars("日本", 2), "日****");
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(mask_last_n_chars("", 2), "");
    }

    #[test]
    fn test_query_unescape() {
        assert_eq!(query_unescape("a%2Cb+c").unwrap(), "a,b c");
        assert_eq!(query_unescape("%2B").unwrap(), "+");
        assert!(matches!(
            query_unescape("bad%"),
            Err(UnescapeError::InvalidEscape(_))
        ));
        assert!(matches!(
            query_unescape("bad%4"),
            Err(UnescapeError::InvalidEscape(_))
        ));
        assert!(matches!(query_unescape("%ff"), Err(UnescapeError::InvalidUtf8(_))));
    }
}
