use sea_orm::{ColumnTrait, Order};

use super::query::{ListParams, SortDir};

/// Direction applied when the request names an allowed column but no direction
const DEFAULT_SORT_DIR: SortDir = SortDir::Desc;

/// Find an allow-listed column by its public name
fn find_column<C>(name: &str, columns: &[(&str, C)]) -> Option<C>
where
    C: ColumnTrait + Copy,
{
    columns
        .iter()
        .find(|&&(col_name, _)| col_name == name)
        .map(|&(_, col)| col)
}

/// Resolve the order clause for a list request.
///
/// The allow-list is the only path from `sortBy` to a column: unknown or
/// missing names fall back to `default_column` descending.
pub fn resolve_sort<C>(params: &ListParams, columns: &[(&str, C)], default_column: C) -> (C, Order)
where
    C: ColumnTrait + Copy,
{
    match params.sort_by.as_deref().and_then(|name| find_column(name, columns)) {
        Some(column) => (column, params.sort_dir.unwrap_or(DEFAULT_SORT_DIR).order()),
        None => {
            if let Some(rejected) = &params.sort_by {
                tracing::debug!(sort_by = %rejected, "sort column not allowed, using default order");
            }
            (default_column, Order::Desc)
        }
    }
}

/// Append `id_column` after `primary` so rows with equal sort keys keep a
/// stable order across pages
pub fn with_tiebreak<C>(primary: (C, Order), id_column: C) -> Vec<(C, Order)>
where
    C: ColumnTrait + Copy,
{
    let (column, direction) = primary;
    if column.as_str() == id_column.as_str() {
        vec![(column, direction)]
    } else {
        vec![(column, direction.clone()), (id_column, direction)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::entities::user::Column;

    fn columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("email", Column::Email),
            ("createdAt", Column::CreatedAt),
        ]
    }

    fn params(sort_by: Option<&str>, sort_dir: Option<SortDir>) -> ListParams {
        ListParams {
            sort_by: sort_by.map(str::to_string),
            sort_dir,
            ..ListParams::default()
        }
    }

    #[test]
    fn test_allowed_column_with_direction() {
        let (column, order) = resolve_sort(&params(Some("email"), Some(SortDir::Asc)), &columns(), Column::Id);
        assert_eq!(column.as_str(), "email");
        assert_eq!(order, Order::Asc);
    }

    #[test]
    fn test_allowed_column_defaults_to_descending() {
        let (column, order) = resolve_sort(&params(Some("createdAt"), None), &columns(), Column::Id);
        assert_eq!(column.as_str(), "created_at");
        assert_eq!(order, Order::Desc);
    }

    #[test]
    fn test_disallowed_column_falls_back_to_default_order() {
        let (column, order) = resolve_sort(&params(Some("password"), Some(SortDir::Asc)), &columns(), Column::Id);
        assert_eq!(column.as_str(), "id");
        assert_eq!(order, Order::Desc);
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let (column, _) = resolve_sort(&params(Some("EMAIL"), None), &columns(), Column::Id);
        assert_eq!(column.as_str(), "id");
    }

    #[test]
    fn test_missing_sort_uses_default() {
        let (column, order) = resolve_sort(&params(None, Some(SortDir::Asc)), &columns(), Column::Id);
        assert_eq!(column.as_str(), "id");
        assert_eq!(order, Order::Desc);
    }

    #[test]
    fn test_tiebreak_appends_id_in_the_same_direction() {
        let order = with_tiebreak((Column::CreatedAt, Order::Asc), Column::Id);
        let names: Vec<_> = order.iter().map(|(c, o)| (c.as_str(), o.clone())).collect();
        assert_eq!(names, vec![("created_at", Order::Asc), ("id", Order::Asc)]);
    }

    #[test]
    fn test_tiebreak_is_skipped_when_sorting_by_id() {
        let order = with_tiebreak((Column::Id, Order::Desc), Column::Id);
        assert_eq!(order.len(), 1);
    }
}
