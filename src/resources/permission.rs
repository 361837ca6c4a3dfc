use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{Condition, ConnectionTrait, Order};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::entities::permission::{self, Column};
use crate::errors::ApiError;
use crate::traits::{ListResource, find_page};

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRow {
    pub id: i32,
    pub name: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<permission::Model> for PermissionRow {
    fn from(model: permission::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl ListResource for PermissionRow {
    type Entity = permission::Entity;
    type Model = permission::Model;
    type Column = Column;

    const RESOURCE_NAME_SINGULAR: &'static str = "Permission";
    const RESOURCE_NAME_PLURAL: &'static str = "permissions";

    const ID_COLUMN: Column = Column::Id;
    const STATUS_COLUMN: Column = Column::Status;
    const CREATED_AT_COLUMN: Column = Column::CreatedAt;
    const UPDATED_AT_COLUMN: Column = Column::UpdatedAt;
    const SEARCH_COLUMN: Column = Column::Name;
    const SEARCH_ALIAS: &'static str = "name";

    fn sortable_columns() -> Vec<(&'static str, Column)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("status", Column::Status),
            ("createdAt", Column::CreatedAt),
            ("updatedAt", Column::UpdatedAt),
        ]
    }

    async fn load_rows<C: ConnectionTrait>(
        db: &C,
        condition: Condition,
        order: Vec<(Column, Order)>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self>, ApiError> {
        let models = find_page::<permission::Entity, C>(db, condition, order, offset, limit).await?;
        Ok(models.into_iter().map(Self::from).collect())
    }
}
