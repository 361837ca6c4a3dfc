//! Embedded JSON query extraction.
//!
//! Some clients send the whole list payload as one parameter:
//! `?query={"page":2,"filters":{"status":true}}`, often percent-encoded twice,
//! quoted, or surrounded by stray characters. [`merge_query_json`] recovers the
//! object and merges its allow-listed keys into the flat query.

use serde_json::{Map, Value};

use crate::errors::ApiError;

/// Keys a parsed payload may never set
const FORBIDDEN_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Keys accepted from an embedded payload unless configured otherwise
pub const DEFAULT_ALLOWED_KEYS: [&str; 14] = [
    "page",
    "pageSize",
    "perPage",
    "sortBy",
    "sortDir",
    "search",
    "q",
    "status",
    "role",
    "roleId",
    "userId",
    "email",
    "createdAt",
    "filters",
];

/// Behaviour when no parsing attempt succeeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    /// Reject the request with a 400
    #[default]
    Fail,
    /// Continue with the query as it arrived
    Ignore,
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Parameter that may carry the JSON payload
    pub source_key: String,
    pub allowed_keys: Vec<String>,
    pub on_error: OnError,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            source_key: "query".to_string(),
            allowed_keys: DEFAULT_ALLOWED_KEYS.iter().map(ToString::to_string).collect(),
            on_error: OnError::Fail,
        }
    }
}

impl MergeOptions {
    #[must_use]
    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    fn allows(&self, key: &str) -> bool {
        !FORBIDDEN_KEYS.contains(&key) && self.allowed_keys.iter().any(|k| k == key)
    }
}

/// Strip a byte-order mark, percent-decode and trim.
fn clean(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let decoded = url_escape::decode(raw);
    let trimmed = decoded.trim();
    trimmed.strip_prefix('\u{feff}').unwrap_or(trimmed).trim().to_string()
}

/// First balanced `{...}` block of `s`, honouring quoted strings and escapes.
#[must_use]
pub fn extract_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0_usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in s[start..].char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => in_string = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&s[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove one layer of surrounding quote characters.
fn trim_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}

fn parse_object(candidate: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(candidate).map_err(|e| e.to_string())? {
        Value::Object(object) => Ok(object),
        _ => Err("payload must be a JSON object".to_string()),
    }
}

/// Parse `raw` with each strategy in turn, collecting the failure of each.
fn parse_payload(raw: &str) -> Result<Map<String, Value>, Vec<String>> {
    let cleaned = clean(raw);
    let mut errors = Vec::with_capacity(3);

    match parse_object(&cleaned) {
        Ok(object) => return Ok(object),
        Err(e) => errors.push(format!("direct: {e}")),
    }
    match extract_balanced_object(&cleaned) {
        Some(segment) => match parse_object(segment) {
            Ok(object) => return Ok(object),
            Err(e) => errors.push(format!("balanced block: {e}")),
        },
        None => errors.push("balanced block: no balanced JSON object found".to_string()),
    }
    match parse_object(trim_quotes(&cleaned)) {
        Ok(object) => Ok(object),
        Err(e) => {
            errors.push(format!("unquoted: {e}"));
            Err(errors)
        }
    }
}

/// Merge the JSON object carried by `options.source_key` into `query`.
///
/// Parsed keys win over keys already present. On success the source parameter
/// is removed. When parsing fails the query is left untouched and, with
/// [`OnError::Fail`], a 400 is returned listing each attempt's error.
pub fn merge_query_json(
    query: &mut Map<String, Value>,
    options: &MergeOptions,
) -> Result<(), ApiError> {
    let Some(Value::String(raw)) = query.get(&options.source_key) else {
        return Ok(());
    };

    let parsed = match parse_payload(raw) {
        Ok(parsed) => parsed,
        Err(errors) => {
            let message = format!(
                "Could not parse '{}' as JSON. Errors: {}",
                options.source_key,
                errors.join(" | ")
            );
            return match options.on_error {
                OnError::Fail => Err(ApiError::bad_request(message)),
                OnError::Ignore => {
                    tracing::debug!(%message, "ignoring unparseable embedded query");
                    Ok(())
                }
            };
        }
    };

    query.remove(&options.source_key);
    for (key, value) in parsed {
        if options.allows(&key) {
            query.insert(key, value);
        } else {
            tracing::debug!(key = %key, "dropping key outside the embedded query allow-list");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_with(raw: &str) -> Map<String, Value> {
        let mut query = Map::new();
        query.insert("query".to_string(), Value::String(raw.to_string()));
        query
    }

    #[test]
    fn test_percent_encoded_payload() {
        let mut query = query_with("%7B%22status%22%3Atrue%7D");
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(Value::Object(query), json!({"status": true}));
    }

    #[test]
    fn test_balanced_block_ignores_surrounding_noise() {
        let mut query = query_with(r#"garbage=={"page":2,"q":"a}b"}trailing}}"#);
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(query["page"], json!(2));
        assert_eq!(query["q"], json!("a}b"));
    }

    #[test]
    fn test_balanced_scan_respects_escapes_and_single_quotes() {
        assert_eq!(
            extract_balanced_object(r#"x{"a":"\"}"}y"#),
            Some(r#"{"a":"\"}"}"#)
        );
        assert_eq!(extract_balanced_object("{'}'}"), Some("{'}'}"));
        assert_eq!(extract_balanced_object("{{}"), None);
        assert_eq!(extract_balanced_object("no braces"), None);
    }

    #[test]
    fn test_quoted_payload() {
        let mut query = query_with(r#"'{"pageSize":25}'"#);
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(query["pageSize"], json!(25));
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let mut query = query_with("\u{feff}{\"sortBy\":\"email\"}");
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(query["sortBy"], json!("email"));
    }

    #[test]
    fn test_parsed_keys_override_existing() {
        let mut query = query_with(r#"{"page":4}"#);
        query.insert("page".to_string(), json!("1"));
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(query["page"], json!(4));
    }

    #[test]
    fn test_disallowed_and_prototype_keys_are_dropped() {
        let mut options = MergeOptions::default();
        options.allowed_keys.push("__proto__".to_string());
        let mut query = query_with(r#"{"__proto__":{"admin":true},"password":"x","q":"ok"}"#);
        merge_query_json(&mut query, &options).unwrap();
        assert_eq!(Value::Object(query), json!({"q": "ok"}));
    }

    #[test]
    fn test_arrays_are_rejected() {
        let mut query = query_with("[1,2,3]");
        let err = merge_query_json(&mut query, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_failure_message_lists_each_attempt() {
        let mut query = query_with("not json");
        let err = merge_query_json(&mut query, &MergeOptions::default()).unwrap_err();
        let message = err.user_message();
        assert!(message.contains("direct:"));
        assert!(message.contains("balanced block:"));
        assert!(message.contains("unquoted:"));
    }

    #[test]
    fn test_ignore_mode_returns_input_unchanged() {
        let mut query = query_with("{broken");
        let before = query.clone();
        merge_query_json(&mut query, &MergeOptions::default().with_on_error(OnError::Ignore))
            .unwrap();
        assert_eq!(query, before);
    }

    #[test]
    fn test_non_string_source_passes_through() {
        let mut query = Map::new();
        query.insert("query".to_string(), json!(["a", "b"]));
        let before = query.clone();
        merge_query_json(&mut query, &MergeOptions::default()).unwrap();
        assert_eq!(query, before);
    }
}
