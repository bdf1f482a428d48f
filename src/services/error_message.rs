//! Best-effort extraction of a human-readable message from a failed response body.
//!
//! Strategies are tried in order and the first one that yields a message wins.
//! When none does, callers fall back to a generic message for the operation.

use serde_json::Value;

/// One way of reading an error message out of a response body
pub type MessageExtractor = fn(&[u8]) -> Option<String>;

/// Structured `detail` field first, then the raw body text
pub const DEFAULT_EXTRACTORS: &[MessageExtractor] = &[detail_field, raw_text];

/// `{"detail": "..."}` as produced by the conversion service.
///
/// Non-string details (validation error lists) are rendered as JSON text.
pub fn detail_field(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let message = match value.get("detail")? {
        Value::Null => return None,
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    (!message.is_empty()).then_some(message)
}

/// The body as text, if there is any
pub fn raw_text(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Run `extractors` in order and return the first message found
pub fn extract_message(body: &[u8], extractors: &[MessageExtractor]) -> Option<String> {
    extractors.iter().find_map(|extract| extract(body))
}

/// Like [`extract_message`], falling back to `fallback` when nothing matched
pub fn message_or(body: &[u8], extractors: &[MessageExtractor], fallback: &str) -> String {
    extract_message(body, extractors).unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Failed to generate LaTeX files";

    #[test]
    fn test_detail_field_wins() {
        let body = br#"{"detail":"Unsupported file format"}"#;
        assert_eq!(
            message_or(body, DEFAULT_EXTRACTORS, FALLBACK),
            "Unsupported file format"
        );
    }

    #[test]
    fn test_plain_text_body() {
        let body = b"Internal Server Error\n";
        assert_eq!(
            message_or(body, DEFAULT_EXTRACTORS, FALLBACK),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_empty_body_uses_fallback() {
        assert_eq!(message_or(b"", DEFAULT_EXTRACTORS, FALLBACK), FALLBACK);
        assert_eq!(message_or(b"  \n", DEFAULT_EXTRACTORS, FALLBACK), FALLBACK);
    }

    #[test]
    fn test_json_without_detail_falls_through_to_text() {
        let body = br#"{"error":"nope"}"#;
        assert_eq!(detail_field(body), None);
        assert_eq!(
            message_or(body, DEFAULT_EXTRACTORS, FALLBACK),
            r#"{"error":"nope"}"#
        );
    }

    #[test]
    fn test_structured_detail_is_rendered() {
        let body = br#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#;
        let message = detail_field(body).unwrap();
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_blank_detail_is_skipped() {
        assert_eq!(detail_field(br#"{"detail":"  "}"#), None);
        assert_eq!(detail_field(br#"{"detail":null}"#), None);
    }

    #[test]
    fn test_order_is_respected() {
        let body = br#"{"detail":"from detail"}"#;
        let text_first: &[MessageExtractor] = &[raw_text, detail_field];
        assert_eq!(
            extract_message(body, text_first).as_deref(),
            Some(r#"{"detail":"from detail"}"#)
        );
    }

    #[test]
    fn test_no_extractors() {
        assert_eq!(extract_message(b"text", &[]), None);
    }
}
