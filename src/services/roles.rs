use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{trimmed, trimmed_opt};
use crate::entities::{permission, role, role_permission};
use crate::errors::ApiError;
use crate::filtering::ListParams;
use crate::pagination::PageFetchResult;
use crate::resources::{RolePermissionRow, RoleRow, role::active_permissions};
use crate::traits::ListResource;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRole {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub name: String,
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update_role"))]
pub struct UpdateRole {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub name: Option<String>,
    pub status: Option<bool>,
    /// Full set of permission ids the role should hold; omitted leaves links untouched
    pub permissions: Option<Vec<i32>>,
}

fn validate_update_role(input: &UpdateRole) -> Result<(), ValidationError> {
    if input.name.is_none() && input.status.is_none() && input.permissions.is_none() {
        return Err(ValidationError::new("empty_update").with_message("at least one field must be provided".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionInput {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub role_id: i32,
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub permission_id: i32,
}

/// Permission ids touched by [`sync_permissions`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: Vec<i32>,
    pub activated: Vec<i32>,
    pub deactivated: Vec<i32>,
}

fn role_not_found(id: i32) -> ApiError {
    ApiError::not_found(RoleRow::RESOURCE_NAME_SINGULAR, Some(id.to_string()))
}

async fn find_role<C: ConnectionTrait>(db: &C, id: i32) -> Result<role::Model, ApiError> {
    role::Entity::find_by_id(id).one(db).await?.ok_or_else(|| role_not_found(id))
}

async fn ensure_name_free<C: ConnectionTrait>(db: &C, name: &str, except: Option<i32>) -> Result<(), ApiError> {
    let mut query = role::Entity::find().filter(role::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(role::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(_) => Err(ApiError::conflict("role name already exists")),
        None => Ok(()),
    }
}

async fn load_row<C: ConnectionTrait>(db: &C, id: i32) -> Result<RoleRow, ApiError> {
    let model = find_role(db, id).await?;
    let permissions = active_permissions(db, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(RoleRow::from_model(model, permissions))
}

pub async fn list(db: &DatabaseConnection, params: &ListParams) -> Result<PageFetchResult<RoleRow>, ApiError> {
    RoleRow::fetch_page(db, params).await
}

pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<RoleRow, ApiError> {
    load_row(db, id).await
}

pub async fn create(db: &DatabaseConnection, input: CreateRole) -> Result<RoleRow, ApiError> {
    ensure_name_free(db, &input.name, None).await?;
    let created = role::ActiveModel {
        name: Set(input.name),
        status: Set(input.status.unwrap_or(true)),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(role_id = created.id, "role created");
    Ok(RoleRow::from_model(created, Vec::new()))
}

/// Update name/status and, when given, replace the permission set. All of it
/// commits together or not at all.
pub async fn update(db: &DatabaseConnection, id: i32, input: UpdateRole) -> Result<RoleRow, ApiError> {
    let txn = db.begin().await?;

    let mut active = find_role(&txn, id).await?.into_active_model();
    if let Some(name) = input.name {
        ensure_name_free(&txn, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Some(Utc::now()));
    active.update(&txn).await?;

    if let Some(wanted) = input.permissions {
        let summary = sync_permissions(&txn, id, &wanted).await?;
        tracing::debug!(role_id = id, ?summary, "role permissions synchronised");
    }

    let row = load_row(&txn, id).await?;
    txn.commit().await?;
    Ok(row)
}

/// Make the active links of `role_id` exactly `wanted`.
///
/// Missing links are created, inactive ones reactivated and links outside the
/// set deactivated; no (role, permission) pair is ever inserted twice. Unknown
/// permission ids fail the whole call with `NotFound`. Run it inside a
/// transaction so a failure leaves the previous set intact.
pub async fn sync_permissions<C: ConnectionTrait>(db: &C, role_id: i32, wanted: &[i32]) -> Result<SyncSummary, ApiError> {
    let wanted: BTreeSet<i32> = wanted.iter().copied().collect();

    if !wanted.is_empty() {
        let known: BTreeSet<i32> = permission::Entity::find()
            .select_only()
            .column(permission::Column::Id)
            .filter(permission::Column::Id.is_in(wanted.iter().copied()))
            .into_tuple::<i32>()
            .all(db)
            .await?
            .into_iter()
            .collect();
        if let Some(missing) = wanted.difference(&known).next() {
            return Err(ApiError::not_found("Permission", Some(missing.to_string())));
        }
    }

    let existing: BTreeMap<i32, bool> = role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| (link.permission_id, link.status))
        .collect();

    let mut summary = SyncSummary::default();
    for &permission_id in &wanted {
        match existing.get(&permission_id) {
            None => summary.created.push(permission_id),
            Some(false) => summary.activated.push(permission_id),
            Some(true) => {}
        }
    }
    summary.deactivated = existing
        .iter()
        .filter(|(permission_id, active)| **active && !wanted.contains(*permission_id))
        .map(|(permission_id, _)| *permission_id)
        .collect();

    let now = Utc::now();
    if !summary.created.is_empty() {
        let links = summary.created.iter().map(|&permission_id| role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
            status: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        });
        role_permission::Entity::insert_many(links).exec(db).await?;
    }
    set_link_status(db, role_id, &summary.activated, true).await?;
    set_link_status(db, role_id, &summary.deactivated, false).await?;

    Ok(summary)
}

async fn set_link_status<C: ConnectionTrait>(db: &C, role_id: i32, permission_ids: &[i32], status: bool) -> Result<(), ApiError> {
    if permission_ids.is_empty() {
        return Ok(());
    }
    role_permission::Entity::update_many()
        .col_expr(role_permission::Column::Status, Expr::value(status))
        .col_expr(role_permission::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(role_permission::Column::RoleId.eq(role_id))
        .filter(role_permission::Column::PermissionId.is_in(permission_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}

/// Soft delete; returns the deactivated role.
pub async fn remove(db: &DatabaseConnection, id: i32) -> Result<RoleRow, ApiError> {
    RoleRow::soft_delete(db, id).await?;
    load_row(db, id).await
}

async fn find_link<C: ConnectionTrait>(db: &C, role_id: i32, permission_id: i32) -> Result<Option<role_permission::Model>, ApiError> {
    Ok(role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .filter(role_permission::Column::PermissionId.eq(permission_id))
        .one(db)
        .await?)
}

/// Grant a permission, reactivating an existing inactive link instead of
/// inserting a duplicate.
pub async fn assign_permission(db: &DatabaseConnection, input: &RolePermissionInput) -> Result<RolePermissionRow, ApiError> {
    find_role(db, input.role_id).await?;
    if permission::Entity::find_by_id(input.permission_id).one(db).await?.is_none() {
        return Err(ApiError::not_found("Permission", Some(input.permission_id.to_string())));
    }

    let link = match find_link(db, input.role_id, input.permission_id).await? {
        Some(link) if link.status => link,
        Some(link) => {
            let mut active = link.into_active_model();
            active.status = Set(true);
            active.updated_at = Set(Some(Utc::now()));
            active.update(db).await?
        }
        None => {
            role_permission::ActiveModel {
                role_id: Set(input.role_id),
                permission_id: Set(input.permission_id),
                status: Set(true),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    Ok(RolePermissionRow::from(link))
}

/// Deactivate a link; `NotFound` when the role never had the permission.
pub async fn remove_permission(db: &DatabaseConnection, input: &RolePermissionInput) -> Result<RolePermissionRow, ApiError> {
    let link = find_link(db, input.role_id, input.permission_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role permission", None))?;

    let mut active = link.into_active_model();
    active.status = Set(false);
    active.updated_at = Set(Some(Utc::now()));
    Ok(RolePermissionRow::from(active.update(db).await?))
}

pub async fn update_status(db: &DatabaseConnection, id: i32, status: bool) -> Result<RoleRow, ApiError> {
    match RoleRow::set_status(db, &[id], status).await? {
        0 => Err(role_not_found(id)),
        _ => load_row(db, id).await,
    }
}

pub async fn bulk_update_status(db: &DatabaseConnection, ids: &[i32], status: bool) -> Result<u64, ApiError> {
    RoleRow::set_status(db, ids, status).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_role_requires_a_field() {
        assert!(UpdateRole::default().validate().is_err());

        let only_permissions: UpdateRole = serde_json::from_str(r#"{"permissions":[]}"#).unwrap();
        assert!(only_permissions.validate().is_ok());
    }

    #[test]
    fn test_create_role_name_is_trimmed() {
        let input: CreateRole = serde_json::from_str(r#"{"name":"  Auditor "}"#).unwrap();
        assert_eq!(input.name, "Auditor");

        let blank: CreateRole = serde_json::from_str(r#"{"name":"   "}"#).unwrap();
        assert!(blank.validate().is_err());
    }
}
