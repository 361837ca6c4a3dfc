//! Bracket-notation filter folding.
//!
//! `filters[status]=true&filters[createdAt][from]=2025-01-01` arrives as flat
//! keys; this folds them into `{"status": "true", "createdAt": {"from": "2025-01-01"}}`.

use serde_json::{Map, Value};

const PREFIX: &str = "filters[";
const SUFFIX: &str = "]";

/// Range bound carried by a `filters[name][from|to]` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    From,
    To,
}

impl Bound {
    fn key(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
        }
    }
}

/// Split a key of the form `filters[name]` or `filters[name][from|to]`.
fn parse_key(key: &str) -> Option<(&str, Option<Bound>)> {
    let inner = key.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    for bound in [Bound::From, Bound::To] {
        let tail = format!("][{}", bound.key());
        if let Some(name) = inner.strip_suffix(tail.as_str()) {
            if !name.is_empty() {
                return Some((name, Some(bound)));
            }
        }
    }
    (!inner.is_empty()).then_some((inner, None))
}

/// Fold every bracket key of `src` into a filter mapping. Keys that are not
/// bracket filters are ignored.
#[must_use]
pub fn fold_bracket_filters(src: &Map<String, Value>) -> Map<String, Value> {
    let mut filters = Map::new();
    for (key, value) in src {
        let Some((name, bound)) = parse_key(key) else {
            continue;
        };
        match bound {
            Some(bound) => {
                let bucket = filters
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !bucket.is_object() {
                    *bucket = Value::Object(Map::new());
                }
                if let Value::Object(range) = bucket {
                    range.insert(bound.key().to_string(), value.clone());
                }
            }
            None => {
                filters.insert(name.to_string(), value.clone());
            }
        }
    }
    filters
}

/// Fold bracket keys of `query` into its `filters` object and remove them from
/// the top level. Range objects already present under `filters` accumulate
/// the folded bounds.
pub fn fold_into_query(query: &mut Map<String, Value>) {
    let folded = fold_bracket_filters(query);
    if folded.is_empty() {
        return;
    }
    query.retain(|key, _| parse_key(key).is_none());

    let target = query
        .entry("filters".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !target.is_object() {
        tracing::debug!("replacing non-object `filters` value with bracket filters");
        *target = Value::Object(Map::new());
    }
    let Value::Object(existing) = target else {
        return;
    };
    for (name, value) in folded {
        if let (Some(Value::Object(current)), Value::Object(incoming)) =
            (existing.get_mut(&name), &value)
        {
            current.extend(incoming.clone());
            continue;
        }
        existing.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    /// Inverse of folding, used to check that no value is lost.
    fn unfold(filters: &Map<String, Value>) -> Map<String, Value> {
        let mut flat = Map::new();
        for (name, value) in filters {
            match value {
                Value::Object(range) => {
                    for (bound, v) in range {
                        flat.insert(format!("filters[{name}][{bound}]"), v.clone());
                    }
                }
                other => {
                    flat.insert(format!("filters[{name}]"), other.clone());
                }
            }
        }
        flat
    }

    #[test]
    fn test_folds_scalars_and_ranges() {
        let src = map(json!({
            "filters[status]": true,
            "filters[createdAt][from]": "2025-01-01",
            "filters[createdAt][to]": "2025-01-31",
        }));
        let folded = fold_bracket_filters(&src);
        assert_eq!(
            Value::Object(folded),
            json!({"status": true, "createdAt": {"from": "2025-01-01", "to": "2025-01-31"}})
        );
    }

    #[test]
    fn test_ignores_non_bracket_keys() {
        let src = map(json!({"page": "2", "filter[status]": "x", "filters[]": "y", "filters[a": "z"}));
        assert!(fold_bracket_filters(&src).is_empty());
    }

    #[test]
    fn test_unknown_sub_key_is_part_of_name() {
        let src = map(json!({"filters[a][b]": "1"}));
        let folded = fold_bracket_filters(&src);
        assert_eq!(folded.get("a][b"), Some(&json!("1")));
    }

    #[test]
    fn test_range_overrides_scalar_of_same_name() {
        let src = map(json!({"filters[createdAt]": "2025-01-01", "filters[createdAt][to]": "2025-01-02"}));
        let folded = fold_bracket_filters(&src);
        assert_eq!(folded["createdAt"], json!({"to": "2025-01-02"}));
    }

    #[test]
    fn test_round_trip_recovers_bracket_keys() {
        let src = map(json!({
            "filters[role]": "admin",
            "filters[status]": "false",
            "filters[createdAt][from]": "2024-12-01",
            "filters[updatedAt][to]": "2025-02-01",
        }));
        let folded = fold_bracket_filters(&src);
        assert_eq!(unfold(&folded), src);
    }

    #[test]
    fn test_fold_into_query_merges_and_strips() {
        let mut query = map(json!({
            "page": "1",
            "filters": {"createdAt": {"from": "2025-01-01"}, "role": "ops"},
            "filters[createdAt][to]": "2025-01-31",
            "filters[status]": "true",
        }));
        fold_into_query(&mut query);
        assert_eq!(
            Value::Object(query),
            json!({
                "page": "1",
                "filters": {
                    "createdAt": {"from": "2025-01-01", "to": "2025-01-31"},
                    "role": "ops",
                    "status": "true",
                }
            })
        );
    }

    #[test]
    fn test_fold_into_query_without_brackets_is_noop() {
        let original = map(json!({"page": "3", "status": "true"}));
        let mut query = original.clone();
        fold_into_query(&mut query);
        assert_eq!(query, original);
    }
}
