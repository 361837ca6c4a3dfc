use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use serde::Serialize;
use serde_json::Value;

use crate::entities::{audit_log, permission, profile_user, role, user};
use crate::errors::ApiError;
use crate::resources::{PermissionRow, ProfileRow, RoleSummary, UserRow};

/// Audited modules, each bound to the entity its snapshots are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditModule {
    User,
    Role,
    Permission,
    ProfileUser,
}

impl AuditModule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Permission => "permission",
            Self::ProfileUser => "profile_user",
        }
    }

    /// Public row of entity `id`, or `None` when it does not exist.
    pub async fn snapshot<C: ConnectionTrait>(self, db: &C, id: i32) -> Result<Option<Value>, ApiError> {
        fn to_json<T: Serialize>(row: Option<T>) -> Option<Value> {
            row.and_then(|row| serde_json::to_value(row).ok())
        }

        Ok(match self {
            Self::User => to_json(user::Entity::find_by_id(id).one(db).await?.map(|u| UserRow::from_model(u, None))),
            Self::Role => to_json(role::Entity::find_by_id(id).one(db).await?.map(RoleSummary::from)),
            Self::Permission => to_json(permission::Entity::find_by_id(id).one(db).await?.map(PermissionRow::from)),
            Self::ProfileUser => to_json(profile_user::Entity::find_by_id(id).one(db).await?.map(ProfileRow::from)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub module: AuditModule,
    pub action: &'static str,
    pub user_id: Option<i32>,
    pub entity_id: Option<i32>,
    pub data_before: Option<Value>,
    pub data_after: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, entry: AuditEntry) -> Result<(), ApiError>;
}

/// Writes entries to `audit_logs`
#[derive(Clone)]
pub struct DbAuditSink {
    db: DatabaseConnection,
}

impl DbAuditSink {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn log(&self, entry: AuditEntry) -> Result<(), ApiError> {
        let row = audit_log::ActiveModel {
            module: Set(entry.module.as_str().to_string()),
            action: Set(entry.action.to_string()),
            user_id: Set(entry.user_id),
            entity_id: Set(entry.entity_id),
            data_before: Set(entry.data_before),
            data_after: Set(entry.data_after),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        tracing::debug!(audit_id = row.id, module = %row.module, action = %row.action, "audit entry recorded");
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn log(&self, entry: AuditEntry) -> Result<(), ApiError> {
        self.entries
            .lock()
            .map_err(|_| ApiError::internal("Audit buffer unavailable", None))?
            .push(entry);
        Ok(())
    }
}
