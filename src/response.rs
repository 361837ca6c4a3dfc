//! Response stage that renders timestamps in the configured UTC offset.
//!
//! Every JSON string holding an RFC 3339 timestamp is rewritten as
//! `YYYY-MM-DDTHH:MM:SS±HH:MM` in that offset, at any depth. Non-JSON
//! responses pass through untouched.

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    response::Response,
};
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Used with `middleware::map_response_with_state(offset, format_dates)`.
pub async fn format_dates(State(offset): State<FixedOffset>, response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "could not buffer response for date formatting");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if !rewrite_timestamps(&mut value, offset) {
        return Response::from_parts(parts, Body::from(bytes));
    }

    match serde_json::to_vec(&value) {
        Ok(rewritten) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Rewrite in place; `true` when anything changed.
pub fn rewrite_timestamps(value: &mut Value, offset: FixedOffset) -> bool {
    match value {
        Value::String(s) => match reformat(s, offset) {
            Some(formatted) => {
                *s = formatted;
                true
            }
            None => false,
        },
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| rewrite_timestamps(item, offset) || changed),
        Value::Object(map) => map
            .values_mut()
            .fold(false, |changed, item| rewrite_timestamps(item, offset) || changed),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

fn reformat(s: &str, offset: FixedOffset) -> Option<String> {
    // cheap reject before parsing: timestamps are at least `YYYY-MM-DDTHH:MM:SSZ`
    if s.len() < 20 || s.as_bytes().get(10) != Some(&b'T') {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(s).ok()?;
    let formatted = parsed.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string();
    (formatted != s).then_some(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_nested_timestamps_are_shifted() {
        let mut value = json!({
            "data": [{"createdAt": "2025-01-02T03:04:05.678Z", "email": "a@b.co"}],
            "meta": {"total": 1}
        });
        assert!(rewrite_timestamps(&mut value, offset(-6)));
        assert_eq!(value["data"][0]["createdAt"], "2025-01-01T21:04:05-06:00");
        assert_eq!(value["data"][0]["email"], "a@b.co");
        assert_eq!(value["meta"]["total"], 1);
    }

    #[test]
    fn test_utc_offset_uses_numeric_form() {
        let mut value = json!("2025-01-02T03:04:05Z");
        assert!(rewrite_timestamps(&mut value, offset(0)));
        assert_eq!(value, "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_non_timestamps_untouched() {
        let mut value = json!(["2025-01-02", "hello", "T-1000", 5, null]);
        let before = value.clone();
        assert!(!rewrite_timestamps(&mut value, offset(2)));
        assert_eq!(value, before);
    }

    #[tokio::test]
    async fn test_non_json_passthrough() {
        let response = Response::builder()
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("2025-01-02T03:04:05Z"))
            .unwrap();
        let response = format_dates(State(offset(1)), response).await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"2025-01-02T03:04:05Z");
    }
}
