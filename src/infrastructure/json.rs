//! JSON helpers for log output

use serde::de::IgnoredAny;
use tracing::warn;

/// Compact a JSON document by dropping insignificant whitespace.
///
/// Key order and duplicate keys are kept as they appear in the input. Input
/// that is not valid JSON (e.g. a truncated body) falls back to stripping
/// line breaks only.
pub fn minify_json(bytes: &[u8]) -> String {
    if let Err(e) = serde_json::from_slice::<IgnoredAny>(bytes) {
        warn!("Fail to compact json: {}", e);
        return String::from_utf8_lossy(bytes).replace(['\n', '\r'], "");
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;

    for &b in bytes {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
