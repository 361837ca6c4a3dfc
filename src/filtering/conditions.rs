use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use super::parse::{end_of_day, start_of_day};

// Longer search terms are cut to this many characters
const MAX_SEARCH_TERM_LENGTH: usize = 256;

/// Escape LIKE wildcards so user input only ever matches literally
#[must_use]
pub fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `UPPER(column) LIKE '%TERM%' ESCAPE '\'`
#[must_use]
pub fn contains_insensitive<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    let term: String = term.trim().chars().take(MAX_SEARCH_TERM_LENGTH).collect();
    let pattern = format!("%{}%", escape_like_wildcards(&term).to_uppercase());
    Expr::expr(Func::upper(Expr::col((column.entity_name(), column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// Creation-time range with whole-day bounds: `from` at 00:00:00.000 and
/// `to` at 23:59:59.999, both inclusive.
#[must_use]
pub fn day_range<C: ColumnTrait>(column: C, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Condition {
    let mut condition = Condition::all();
    if let Some(from) = from {
        condition = condition.add(column.gte(start_of_day(from)));
    }
    if let Some(to) = to {
        condition = condition.add(column.lte(end_of_day(to)));
    }
    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait, Statement, Value};

    use crate::entities::user;

    fn build(condition: Condition) -> Statement {
        user::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
    }

    fn values(statement: &Statement) -> Vec<Value> {
        statement.values.clone().map(|v| v.0).unwrap_or_default()
    }

    fn text(s: &str) -> Value {
        Value::from(s.to_string())
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like_wildcards("plain"), "plain");
    }

    #[test]
    fn test_contains_insensitive_uppercases_and_escapes() {
        let statement = build(Condition::all().add(contains_insensitive(user::Column::Email, " a_b ")));
        assert!(statement.sql.contains(r#"UPPER("users"."email") LIKE ?"#), "{}", statement.sql);
        assert!(statement.sql.contains("ESCAPE"), "{}", statement.sql);
        assert_eq!(values(&statement), vec![text("%A\\_B%")]);
    }

    #[test]
    fn test_search_value_is_bound_not_inlined() {
        let statement = build(Condition::all().add(contains_insensitive(
            user::Column::Email,
            "'; DROP TABLE users; --",
        )));
        assert!(!statement.sql.contains("DROP"), "{}", statement.sql);
        assert_eq!(values(&statement), vec![text("%'; DROP TABLE USERS; --%")]);
    }

    #[test]
    fn test_long_terms_are_truncated() {
        let long = "x".repeat(MAX_SEARCH_TERM_LENGTH * 2);
        let statement = build(Condition::all().add(contains_insensitive(user::Column::Email, &long)));
        let expected = format!("%{}%", "X".repeat(MAX_SEARCH_TERM_LENGTH));
        assert_eq!(values(&statement), vec![text(&expected)]);
    }

    #[test]
    fn test_day_range_bounds() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let statement = build(day_range(user::Column::CreatedAt, Some(day), Some(day)));
        assert!(statement.sql.contains(r#""users"."created_at" >= ?"#), "{}", statement.sql);
        assert!(statement.sql.contains(r#""users"."created_at" <= ?"#), "{}", statement.sql);
        assert_eq!(
            values(&statement),
            vec![Value::from(start_of_day(day)), Value::from(end_of_day(day))]
        );
    }

    #[test]
    fn test_open_ended_range() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let statement = build(day_range(user::Column::CreatedAt, None, Some(day)));
        assert!(!statement.sql.contains(">="));
        assert_eq!(values(&statement), vec![Value::from(end_of_day(day))]);
    }

    #[test]
    fn test_empty_range_adds_nothing() {
        let statement = build(day_range(user::Column::CreatedAt, None, None));
        assert!(!statement.sql.contains("WHERE"), "{}", statement.sql);
    }
}
