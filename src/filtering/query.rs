//! Normalization of raw list queries into [`ListParams`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sea_orm::Order;
use serde::Serialize;
use serde_json::{Map, Number, Value, json};

use super::brackets::fold_into_query;
use super::embedded::{MergeOptions, merge_query_json};
use super::parse::{clamp_integer, non_empty_str, parse_bool, parse_date_only};
use crate::errors::ApiError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 1000;
/// Largest offset a storage driver accepts
#[allow(clippy::cast_sign_loss)]
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Keys consumed by the normalizer itself; everything else is a filter
const CORE_KEYS: [&str; 7] = ["page", "pageSize", "perPage", "sortBy", "sortDir", "search", "q"];

/// Settings for [`ListParams::from_query`]
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub merge: MergeOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            merge: MergeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// Case-insensitive `asc`/`desc`; anything else is unset.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub fn order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

/// Single filter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Normalized filter value. Empty strings and nulls never become a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<NaiveDate>,
    },
    List(Vec<Scalar>),
}

impl FilterValue {
    /// `None` when the raw value carries nothing usable.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(range) => {
                let bound = |key: &str| range.get(key).and_then(non_empty_str).and_then(parse_date_only);
                let (from, to) = (bound("from"), bound("to"));
                (from.is_some() || to.is_some()).then_some(Self::Range { from, to })
            }
            Value::Array(items) => {
                let list: Vec<Scalar> = items.iter().filter_map(Scalar::from_json).collect();
                (!list.is_empty()).then_some(Self::List(list))
            }
            scalar => Scalar::from_json(scalar).map(Self::Scalar),
        }
    }
}

/// Filters by name, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filters(BTreeMap<String, FilterValue>);

impl Filters {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FilterValue) {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Trimmed text of a scalar filter.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FilterValue::Scalar(Scalar::Text(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Strict boolean reading of a scalar filter.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FilterValue::Scalar(scalar) => parse_bool(&scalar.to_json()),
            _ => None,
        }
    }

    #[must_use]
    pub fn date_range(&self, name: &str) -> Option<(Option<NaiveDate>, Option<NaiveDate>)> {
        match self.get(name)? {
            FilterValue::Range { from, to } => Some((*from, *to)),
            _ => None,
        }
    }

    /// Integer reading of a scalar filter.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FilterValue::Scalar(Scalar::Number(n)) => n.as_i64(),
            FilterValue::Scalar(Scalar::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Canonical list request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: u64,
    pub page_size: u64,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDir>,
    pub search: Option<String>,
    pub filters: Filters,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_dir: None,
            search: None,
            filters: Filters::default(),
        }
    }
}

impl ListParams {
    /// Build from the raw query mapping. Only the embedded JSON extraction can
    /// fail; every other malformed value falls back to a default.
    pub fn from_query(mut raw: Map<String, Value>, options: &QueryOptions) -> Result<Self, ApiError> {
        merge_query_json(&mut raw, &options.merge)?;
        fold_into_query(&mut raw);

        let page = clamp_integer(raw.get("page").unwrap_or(&json!(1)), 1, i64::MAX);
        let raw_size = raw
            .get("pageSize")
            .filter(|v| !v.is_null())
            .or_else(|| raw.get("perPage"))
            .cloned()
            .unwrap_or_else(|| json!(options.default_page_size));
        let max_page_size = i64::try_from(options.max_page_size.max(1)).unwrap_or(i64::MAX);
        let page_size = clamp_integer(&raw_size, 1, max_page_size);

        let sort_by = raw.get("sortBy").and_then(non_empty_str).map(str::to_string);
        let sort_dir = raw.get("sortDir").and_then(Value::as_str).and_then(SortDir::parse);
        let search = raw
            .get("search")
            .and_then(non_empty_str)
            .or_else(|| raw.get("q").and_then(non_empty_str))
            .map(str::to_string);

        let filters = collect_filters(&raw, &options.merge.source_key);

        let params = Self {
            page: u64::try_from(page).unwrap_or(1),
            page_size: u64::try_from(page_size).unwrap_or(options.default_page_size),
            sort_by,
            sort_dir,
            search,
            filters,
        };
        tracing::debug!(
            page = params.page,
            page_size = params.page_size,
            sort_by = ?params.sort_by,
            filters = ?params.filters.names().collect::<Vec<_>>(),
            "normalized list query"
        );
        Ok(params)
    }

    /// Rows to skip before the requested page, capped at `i64::MAX` so it
    /// always binds as a signed SQL integer
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(MAX_OFFSET)
    }
}

/// Non-core top-level keys, then the nested `filters` object on top.
fn collect_filters(raw: &Map<String, Value>, source_key: &str) -> Filters {
    let mut filters = Filters::default();
    let mut put = |name: &str, value: &Value| {
        if let Some(value) = FilterValue::from_json(value) {
            filters.insert(name, value);
        }
    };

    for (key, value) in raw {
        if CORE_KEYS.contains(&key.as_str()) || key == source_key || key == "filters" {
            continue;
        }
        put(key, value);
    }
    if let Some(Value::Object(nested)) = raw.get("filters") {
        for (key, value) in nested {
            put(key, value);
        }
    }
    filters
}
