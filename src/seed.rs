//! Idempotent bootstrap data: the permission catalog and a `SuperAdmin` role
//! holding `full_permissions`.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use crate::auth::{FULL_PERMISSIONS, permission_catalog};
use crate::entities::{permission, role, role_permission};
use crate::errors::ApiError;

pub const SUPER_ADMIN_ROLE: &str = "SuperAdmin";

/// What a seeding run inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub role_created: bool,
    pub link_created: bool,
}

pub async fn seed<C: TransactionTrait>(db: &C) -> Result<SeedReport, ApiError> {
    let txn = db.begin().await?;
    let mut report = SeedReport::default();

    for name in permission_catalog() {
        let (_, created) = find_or_create_permission(&txn, &name).await?;
        if created {
            report.permissions_created += 1;
        }
    }

    let super_admin = match role::Entity::find()
        .filter(role::Column::Name.eq(SUPER_ADMIN_ROLE))
        .one(&txn)
        .await?
    {
        Some(existing) => existing,
        None => {
            report.role_created = true;
            role::ActiveModel {
                name: Set(SUPER_ADMIN_ROLE.to_string()),
                status: Set(true),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let (full, _) = find_or_create_permission(&txn, FULL_PERMISSIONS).await?;
    let linked = role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.eq(super_admin.id))
        .filter(role_permission::Column::PermissionId.eq(full.id))
        .one(&txn)
        .await?
        .is_some();
    if !linked {
        report.link_created = true;
        role_permission::ActiveModel {
            role_id: Set(super_admin.id),
            permission_id: Set(full.id),
            status: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::info!(
        permissions_created = report.permissions_created,
        role_created = report.role_created,
        link_created = report.link_created,
        "seed complete"
    );
    Ok(report)
}

async fn find_or_create_permission<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<(permission::Model, bool), ApiError> {
    if let Some(existing) = permission::Entity::find()
        .filter(permission::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok((existing, false));
    }

    let created = permission::ActiveModel {
        name: Set(name.to_string()),
        status: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}
