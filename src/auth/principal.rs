use std::collections::BTreeSet;

use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait};

use super::permission_names::FULL_PERMISSIONS;
use crate::entities::{permission, role, role_permission, user};
use crate::errors::ApiError;

/// Authenticated caller and the permission names it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub email: String,
    pub role_id: i32,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    /// Resolve the caller from storage.
    ///
    /// The user must exist and be active. Permissions are the active
    /// permissions linked through active links to the user's role, and only
    /// when that role is itself active.
    pub async fn load<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Self, ApiError> {
        let (user, role) = user::Entity::find_by_id(user_id)
            .find_also_related(role::Entity)
            .one(db)
            .await?
            .filter(|(user, _)| user.status)
            .ok_or_else(|| ApiError::unauthorized("invalid token"))?;

        let permissions = match role {
            Some(role) if role.status => permission::Entity::find()
                .join(JoinType::InnerJoin, permission::Relation::RolePermission.def())
                .filter(role_permission::Column::RoleId.eq(role.id))
                .filter(role_permission::Column::Status.eq(true))
                .filter(permission::Column::Status.eq(true))
                .all(db)
                .await?
                .into_iter()
                .map(|p| p.name)
                .collect(),
            _ => BTreeSet::new(),
        };

        Ok(Self {
            user_id: user.id,
            email: user.email,
            role_id: user.role_id,
            permissions,
        })
    }

    /// Holds `name`, or `full_permissions`
    #[must_use]
    pub fn can(&self, name: &str) -> bool {
        self.permissions.contains(FULL_PERMISSIONS) || self.permissions.contains(name)
    }
}

/// Reads the principal placed in the request extensions by `require_auth`
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }
}
