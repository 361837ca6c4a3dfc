use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::Query,
};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use super::RoleSummary;
use crate::entities::{profile_user, role, user};
use crate::errors::ApiError;
use crate::filtering::conditions::contains_insensitive;
use crate::filtering::query::Filters;
use crate::traits::ListResource;

/// User as returned by the API. The password digest and refresh token never
/// leave the service.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub role_id: i32,
    pub role: Option<RoleSummary>,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRow {
    #[must_use]
    pub fn from_model(model: user::Model, role: Option<role::Model>) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role_id: model.role_id,
            role: role.map(RoleSummary::from),
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRow {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: bool,
    pub user_id: Option<i32>,
}

impl From<profile_user::Model> for ProfileRow {
    fn from(model: profile_user::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            status: model.status,
            user_id: model.user_id,
        }
    }
}

/// User with its linked profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserRow,
    pub profile: Option<ProfileRow>,
}

#[async_trait]
impl ListResource for UserRow {
    type Entity = user::Entity;
    type Model = user::Model;
    type Column = user::Column;

    const RESOURCE_NAME_SINGULAR: &'static str = "User";
    const RESOURCE_NAME_PLURAL: &'static str = "users";

    const ID_COLUMN: user::Column = user::Column::Id;
    const STATUS_COLUMN: user::Column = user::Column::Status;
    const CREATED_AT_COLUMN: user::Column = user::Column::CreatedAt;
    const UPDATED_AT_COLUMN: user::Column = user::Column::UpdatedAt;
    const SEARCH_COLUMN: user::Column = user::Column::Email;
    const SEARCH_ALIAS: &'static str = "email";

    fn sortable_columns() -> Vec<(&'static str, user::Column)> {
        vec![
            ("id", user::Column::Id),
            ("email", user::Column::Email),
            ("status", user::Column::Status),
            ("createdAt", user::Column::CreatedAt),
            ("updatedAt", user::Column::UpdatedAt),
        ]
    }

    fn filterable_fields() -> Vec<&'static str> {
        vec![Self::SEARCH_ALIAS, "status", "role", "roleId", "createdAt"]
    }

    /// `role`: substring of the role name; `roleId`: exact role.
    fn extra_condition(filters: &Filters) -> Option<Condition> {
        let mut condition = Condition::all();
        if let Some(role_name) = filters.text("role") {
            let matching_roles = Query::select()
                .column(role::Column::Id)
                .from(role::Entity)
                .and_where(contains_insensitive(role::Column::Name, role_name))
                .to_owned();
            condition = condition.add(user::Column::RoleId.in_subquery(matching_roles));
        }
        if let Some(role_id) = filters.integer("roleId") {
            condition = condition.add(user::Column::RoleId.eq(role_id));
        }
        (!condition.is_empty()).then_some(condition)
    }

    async fn load_rows<C: ConnectionTrait>(
        db: &C,
        condition: Condition,
        order: Vec<(user::Column, Order)>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self>, ApiError> {
        let mut query = user::Entity::find().filter(condition);
        for (column, direction) in order {
            query = query.order_by(column, direction);
        }
        let rows = query
            .offset(offset)
            .limit(limit)
            .find_also_related(role::Entity)
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(user, role)| Self::from_model(user, role))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::{ListParams, QueryOptions};
    use sea_orm::{DbBackend, QueryTrait};
    use serde_json::{Value, json};

    fn params(value: Value) -> ListParams {
        let Value::Object(raw) = value else { unreachable!() };
        ListParams::from_query(raw, &QueryOptions::default()).unwrap()
    }

    fn where_sql(params: &ListParams) -> String {
        user::Entity::find()
            .filter(UserRow::build_condition(params))
            .build(DbBackend::Sqlite)
            .sql
    }

    #[test]
    fn test_no_filters_builds_no_predicate() {
        assert!(!where_sql(&params(json!({}))).contains("WHERE"));
    }

    #[test]
    fn test_email_alias_searches_email() {
        let sql = where_sql(&params(json!({"email": "gmail"})));
        assert!(sql.contains(r#"UPPER("users"."email") LIKE"#), "{sql}");
    }

    #[test]
    fn test_role_filter_uses_subquery_on_role_name() {
        let sql = where_sql(&params(json!({"role": "adm"})));
        assert!(sql.contains(r#""users"."role_id" IN (SELECT"#), "{sql}");
        assert!(sql.contains(r#"UPPER("roles"."name") LIKE"#), "{sql}");
    }

    #[test]
    fn test_unparseable_status_is_ignored() {
        let sql = where_sql(&params(json!({"status": "maybe"})));
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn test_unknown_filters_are_ignored() {
        let sql = where_sql(&params(json!({"password": "x", "refreshToken": "y"})));
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn test_sort_allow_list_rejects_password() {
        let order = UserRow::build_order(&params(json!({"sortBy": "password", "sortDir": "asc"})));
        assert_eq!(order.len(), 1);
        assert_eq!(sea_orm::IdenStatic::as_str(&order[0].0), "id");
        assert_eq!(order[0].1, Order::Desc);
    }

    #[test]
    fn test_sort_by_email_breaks_ties_on_id() {
        let order = UserRow::build_order(&params(json!({"sortBy": "email", "sortDir": "asc"})));
        let names: Vec<_> = order
            .iter()
            .map(|(column, direction)| (sea_orm::IdenStatic::as_str(column), direction.clone()))
            .collect();
        assert_eq!(names, vec![("email", Order::Asc), ("id", Order::Asc)]);
    }

    #[test]
    fn test_user_row_hides_secrets() {
        let now = Utc::now();
        let model = user::Model {
            id: 1,
            email: "a@b.c".to_string(),
            password: "$argon2id$secret".to_string(),
            role_id: 2,
            status: true,
            refresh_token: Some("token".to_string()),
            created_at: now,
            updated_at: None,
        };
        let json = serde_json::to_value(UserRow::from_model(model, None)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("refreshToken").is_none());
        assert!(json.get("updatedAt").is_none());
        assert_eq!(json["roleId"], 2);
    }
}
