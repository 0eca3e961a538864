//! JSON recovery from free-form model output.
//!
//! Even with JSON output requested, model replies routinely arrive wrapped
//! in markdown code fences or surrounded by prose ("Here is the JSON you
//! asked for: ..."). [`extract_json`] runs an ordered fallback chain:
//! strip fence markers, try a direct parse, then carve out the substring
//! between the first opening delimiter and the last matching closer. When
//! nothing parses, the caller gets [`GatewayError::MalformedResponse`]
//! with the untouched raw text, never a partially-parsed or guessed
//! value.
//!
//! The span heuristic uses last-index-of rather than balanced-bracket
//! counting: a reply containing several top-level JSON fragments, or
//! unbalanced braces inside string literals, can defeat it. In practice a
//! reply asked for a single object or array parses on the first or second
//! step.

use serde_json::Value;

use crate::error::GatewayError;

/// Recover a JSON value from a raw model reply.
///
/// Decoding is pure: calling it twice on the same text yields structurally
/// equal values.
pub fn extract_json(raw: &str) -> Result<Value, GatewayError> {
    let cleaned = strip_code_fences(raw);

    let direct_err = match serde_json::from_str(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = delimited_span(&cleaned) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    Err(GatewayError::MalformedResponse {
        detail: direct_err.to_string(),
        raw: raw.to_string(),
    })
}

/// Like [`extract_json`], but an empty reply decodes to `fallback`
/// instead of failing.
///
/// Operations where an empty reply is meaningful pass the shape they
/// expect: `json!([])` for list generators, `json!({})` for the audit.
pub fn extract_json_or(raw: &str, fallback: Value) -> Result<Value, GatewayError> {
    if raw.trim().is_empty() {
        return Ok(fallback);
    }
    extract_json(raw)
}

/// Remove markdown code-fence markers (the `json`-tagged and bare
/// triple-backtick forms) and surrounding whitespace.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// The substring from the first opening delimiter to the last closing
/// delimiter of the matching kind. An object wins over an array when its
/// brace appears first.
fn delimited_span(text: &str) -> Option<&str> {
    let brace = text.find('{');
    let bracket = text.find('[');

    let (open, close) = match (brace, bracket) {
        (Some(b), Some(k)) if b < k => (b, text.rfind('}')?),
        (Some(b), None) => (b, text.rfind('}')?),
        (_, Some(k)) => (k, text.rfind(']')?),
        (None, None) => return None,
    };

    if close < open {
        return None;
    }
    text.get(open..=close)
}
