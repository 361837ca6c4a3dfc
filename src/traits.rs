use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use serde::Serialize;

use crate::errors::ApiError;
use crate::filtering::{
    ListParams,
    conditions::{contains_insensitive, day_range},
    query::Filters,
    sort::{resolve_sort, with_tiebreak},
};
use crate::pagination::PageFetchResult;

/// A row type exposed through a paginated list endpoint.
///
/// Implementors declare their columns and allow-lists; the predicate, order
/// and fetch logic is shared.
#[async_trait]
pub trait ListResource: Serialize + Sized + Send + Sync + 'static {
    type Entity: EntityTrait<Column = Self::Column, Model = Self::Model> + Sync;
    type Model: FromQueryResult + Send + Sync + 'static;
    type Column: ColumnTrait + Copy + Send + Sync;

    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    const ID_COLUMN: Self::Column;
    const STATUS_COLUMN: Self::Column;
    const CREATED_AT_COLUMN: Self::Column;
    const UPDATED_AT_COLUMN: Self::Column;
    /// Text column matched by `search`
    const SEARCH_COLUMN: Self::Column;
    /// Filter name that doubles as a search term when `search`/`q` are absent
    const SEARCH_ALIAS: &'static str;

    /// Public sort names and the columns they map to
    fn sortable_columns() -> Vec<(&'static str, Self::Column)>;

    /// Filter names understood by [`ListResource::build_condition`]
    fn filterable_fields() -> Vec<&'static str> {
        vec![Self::SEARCH_ALIAS, "status", "createdAt"]
    }

    /// Filter and sort names a client may use, rendered for API docs
    #[must_use]
    fn listing_contract() -> String {
        let sortable: Vec<&str> = Self::sortable_columns().into_iter().map(|(name, _)| name).collect();
        format!(
            "List filters: {}. Sortable by: {}.",
            Self::filterable_fields().join(", "),
            sortable.join(", ")
        )
    }

    /// Resource-specific predicates on top of search, status and creation date
    fn extra_condition(_filters: &Filters) -> Option<Condition> {
        None
    }

    /// Hydrate rows for one page
    async fn load_rows<C: ConnectionTrait>(
        db: &C,
        condition: Condition,
        order: Vec<(Self::Column, Order)>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self>, ApiError>;

    #[must_use]
    fn build_condition(params: &ListParams) -> Condition {
        let filters = &params.filters;
        let mut condition = Condition::all();

        let search = params
            .search
            .as_deref()
            .or_else(|| filters.text(Self::SEARCH_ALIAS));
        if let Some(term) = search {
            condition = condition.add(contains_insensitive(Self::SEARCH_COLUMN, term));
        }

        if let Some(status) = filters.boolean("status") {
            condition = condition.add(Self::STATUS_COLUMN.eq(status));
        }

        if let Some((from, to)) = filters.date_range("createdAt") {
            condition = condition.add(day_range(Self::CREATED_AT_COLUMN, from, to));
        }

        if let Some(extra) = Self::extra_condition(filters) {
            condition = condition.add(extra);
        }
        condition
    }

    /// Requested order followed by the id tiebreaker
    #[must_use]
    fn build_order(params: &ListParams) -> Vec<(Self::Column, Order)> {
        let primary = resolve_sort(params, &Self::sortable_columns(), Self::ID_COLUMN);
        with_tiebreak(primary, Self::ID_COLUMN)
    }

    async fn total_count<C: ConnectionTrait>(db: &C, condition: Condition) -> Result<u64, ApiError> {
        let query = Self::Entity::find().filter(condition);
        Ok(PaginatorTrait::count(query, db).await?)
    }

    /// Count and page fetch run concurrently; they may observe different
    /// snapshots under concurrent writes.
    async fn fetch_page<C: ConnectionTrait>(
        db: &C,
        params: &ListParams,
    ) -> Result<PageFetchResult<Self>, ApiError> {
        let condition = Self::build_condition(params);
        let order = Self::build_order(params);

        let (total, data) = tokio::try_join!(
            Self::total_count(db, condition.clone()),
            Self::load_rows(db, condition, order, params.offset(), params.page_size),
        )?;

        Ok(PageFetchResult {
            data,
            total,
            page: params.page,
            page_size: params.page_size,
        })
    }

    /// Flip `status` on every listed id; returns the number of rows touched.
    async fn set_status<C: ConnectionTrait>(db: &C, ids: &[i32], status: bool) -> Result<u64, ApiError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = Self::Entity::update_many()
            .col_expr(Self::STATUS_COLUMN, Expr::value(status))
            .col_expr(Self::UPDATED_AT_COLUMN, Expr::value(chrono::Utc::now()))
            .filter(Self::ID_COLUMN.is_in(ids.iter().copied()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Logical delete; `NotFound` when no row has `id`.
    async fn soft_delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), ApiError> {
        match Self::set_status(db, &[id], false).await? {
            0 => Err(ApiError::not_found(Self::RESOURCE_NAME_SINGULAR, Some(id.to_string()))),
            _ => Ok(()),
        }
    }
}

/// Plain page query shared by resources that need no joins
pub async fn find_page<E, C>(
    db: &C,
    condition: Condition,
    order: Vec<(E::Column, Order)>,
    offset: u64,
    limit: u64,
) -> Result<Vec<E::Model>, ApiError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let query = order
        .into_iter()
        .fold(E::find().filter(condition), |query, (column, direction)| {
            query.order_by(column, direction)
        });
    Ok(query
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?)
}
