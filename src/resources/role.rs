use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use super::PermissionRow;
use crate::entities::{permission, role, role_permission};
use crate::errors::ApiError;
use crate::traits::{ListResource, find_page};

/// Role as embedded in other rows
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub id: i32,
    pub name: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<role::Model> for RoleSummary {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Role with the permissions of its active links
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleRow {
    pub id: i32,
    pub name: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub permissions: Vec<PermissionRow>,
}

impl RoleRow {
    #[must_use]
    pub fn from_model(model: role::Model, permissions: Vec<PermissionRow>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
            permissions,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionRow {
    pub id: i32,
    pub role_id: i32,
    pub permission_id: i32,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<role_permission::Model> for RolePermissionRow {
    fn from(model: role_permission::Model) -> Self {
        Self {
            id: model.id,
            role_id: model.role_id,
            permission_id: model.permission_id,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Permissions reachable through active links, keyed by role id.
pub async fn active_permissions<C: ConnectionTrait>(
    db: &C,
    role_ids: &[i32],
) -> Result<HashMap<i32, Vec<PermissionRow>>, ApiError> {
    if role_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let links = role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.is_in(role_ids.iter().copied()))
        .filter(role_permission::Column::Status.eq(true))
        .order_by_asc(role_permission::Column::PermissionId)
        .find_also_related(permission::Entity)
        .all(db)
        .await?;

    let mut by_role: HashMap<i32, Vec<PermissionRow>> = HashMap::new();
    for (link, permission) in links {
        if let Some(permission) = permission {
            by_role
                .entry(link.role_id)
                .or_default()
                .push(PermissionRow::from(permission));
        }
    }
    Ok(by_role)
}

#[async_trait]
impl ListResource for RoleRow {
    type Entity = role::Entity;
    type Model = role::Model;
    type Column = role::Column;

    const RESOURCE_NAME_SINGULAR: &'static str = "Role";
    const RESOURCE_NAME_PLURAL: &'static str = "roles";

    const ID_COLUMN: role::Column = role::Column::Id;
    const STATUS_COLUMN: role::Column = role::Column::Status;
    const CREATED_AT_COLUMN: role::Column = role::Column::CreatedAt;
    const UPDATED_AT_COLUMN: role::Column = role::Column::UpdatedAt;
    const SEARCH_COLUMN: role::Column = role::Column::Name;
    const SEARCH_ALIAS: &'static str = "name";

    fn sortable_columns() -> Vec<(&'static str, role::Column)> {
        vec![
            ("id", role::Column::Id),
            ("name", role::Column::Name),
            ("status", role::Column::Status),
            ("createdAt", role::Column::CreatedAt),
            ("updatedAt", role::Column::UpdatedAt),
        ]
    }

    async fn load_rows<C: ConnectionTrait>(
        db: &C,
        condition: Condition,
        order: Vec<(role::Column, Order)>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self>, ApiError> {
        let roles = find_page::<role::Entity, C>(db, condition, order, offset, limit).await?;
        let ids: Vec<i32> = roles.iter().map(|r| r.id).collect();
        let mut permissions = active_permissions(db, &ids).await?;

        Ok(roles
            .into_iter()
            .map(|model| {
                let granted = permissions.remove(&model.id).unwrap_or_default();
                Self::from_model(model, granted)
            })
            .collect())
    }
}
