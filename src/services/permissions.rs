use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{trimmed, trimmed_opt};
use crate::entities::permission;
use crate::errors::ApiError;
use crate::filtering::ListParams;
use crate::pagination::PageFetchResult;
use crate::resources::PermissionRow;
use crate::traits::ListResource;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePermission {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 120, message = "must be between 2 and 120 characters"))]
    pub name: String,
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update_permission"))]
pub struct UpdatePermission {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 2, max = 120, message = "must be between 2 and 120 characters"))]
    pub name: Option<String>,
    pub status: Option<bool>,
}

fn validate_update_permission(input: &UpdatePermission) -> Result<(), ValidationError> {
    if input.name.is_none() && input.status.is_none() {
        return Err(ValidationError::new("empty_update").with_message("at least one field must be provided".into()));
    }
    Ok(())
}

fn permission_not_found(id: i32) -> ApiError {
    ApiError::not_found(PermissionRow::RESOURCE_NAME_SINGULAR, Some(id.to_string()))
}

async fn find_permission(db: &DatabaseConnection, id: i32) -> Result<permission::Model, ApiError> {
    permission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| permission_not_found(id))
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<i32>) -> Result<(), ApiError> {
    let mut query = permission::Entity::find().filter(permission::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(permission::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(_) => Err(ApiError::conflict("permission name already exists")),
        None => Ok(()),
    }
}

pub async fn list(db: &DatabaseConnection, params: &ListParams) -> Result<PageFetchResult<PermissionRow>, ApiError> {
    PermissionRow::fetch_page(db, params).await
}

/// Every permission, unpaginated, by id
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<PermissionRow>, ApiError> {
    Ok(permission::Entity::find()
        .order_by_asc(permission::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(PermissionRow::from)
        .collect())
}

pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<PermissionRow, ApiError> {
    find_permission(db, id).await.map(PermissionRow::from)
}

pub async fn create(db: &DatabaseConnection, input: CreatePermission) -> Result<PermissionRow, ApiError> {
    ensure_name_free(db, &input.name, None).await?;
    let created = permission::ActiveModel {
        name: Set(input.name),
        status: Set(input.status.unwrap_or(true)),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(PermissionRow::from(created))
}

pub async fn update(db: &DatabaseConnection, id: i32, input: UpdatePermission) -> Result<PermissionRow, ApiError> {
    let mut active = find_permission(db, id).await?.into_active_model();
    if let Some(name) = input.name {
        ensure_name_free(db, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Some(Utc::now()));
    Ok(PermissionRow::from(active.update(db).await?))
}

/// Soft delete; returns the deactivated permission.
pub async fn remove(db: &DatabaseConnection, id: i32) -> Result<PermissionRow, ApiError> {
    PermissionRow::soft_delete(db, id).await?;
    get_by_id(db, id).await
}
