use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{normalize_email, trimmed, trimmed_opt};
use crate::auth::PasswordHasher;
use crate::entities::{profile_user, role, user};
use crate::errors::ApiError;
use crate::filtering::ListParams;
use crate::pagination::PageFetchResult;
use crate::resources::{ProfileRow, UserDetail, UserRow};
use crate::traits::ListResource;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub role_id: i32,
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_user"))]
pub struct UpdateUser {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email(message = "must be a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub role_id: Option<i32>,
    pub status: Option<bool>,
}

fn validate_update_user(input: &UpdateUser) -> Result<(), ValidationError> {
    if input.email.is_none() && input.password.is_none() && input.role_id.is_none() && input.status.is_none() {
        return Err(ValidationError::new("empty_update").with_message("at least one field must be provided".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PasswordInput {
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePassword {
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRole {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub role_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfile {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub profile_id: i32,
}

fn user_not_found(id: i32) -> ApiError {
    ApiError::not_found(UserRow::RESOURCE_NAME_SINGULAR, Some(id.to_string()))
}

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| user_not_found(id))
}

async fn ensure_role_exists(db: &DatabaseConnection, role_id: i32) -> Result<(), ApiError> {
    match role::Entity::find_by_id(role_id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Role", Some(role_id.to_string()))),
    }
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except: Option<i32>) -> Result<(), ApiError> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(_) => Err(ApiError::conflict("email already exists")),
        None => Ok(()),
    }
}

async fn load_row(db: &DatabaseConnection, id: i32) -> Result<UserRow, ApiError> {
    user::Entity::find_by_id(id)
        .find_also_related(role::Entity)
        .one(db)
        .await?
        .map(|(user, role)| UserRow::from_model(user, role))
        .ok_or_else(|| user_not_found(id))
}

async fn linked_profile(db: &DatabaseConnection, user_id: i32) -> Result<Option<profile_user::Model>, ApiError> {
    Ok(profile_user::Entity::find()
        .filter(profile_user::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn list(db: &DatabaseConnection, params: &ListParams) -> Result<PageFetchResult<UserRow>, ApiError> {
    UserRow::fetch_page(db, params).await
}

pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<UserDetail, ApiError> {
    let user = load_row(db, id).await?;
    let profile = linked_profile(db, id).await?.map(ProfileRow::from);
    Ok(UserDetail { user, profile })
}

pub async fn create(db: &DatabaseConnection, hasher: &dyn PasswordHasher, input: CreateUser) -> Result<UserRow, ApiError> {
    let email = normalize_email(&input.email);
    ensure_email_free(db, &email, None).await?;
    ensure_role_exists(db, input.role_id).await?;

    let created = user::ActiveModel {
        email: Set(email),
        password: Set(hasher.hash(&input.password)?),
        role_id: Set(input.role_id),
        status: Set(input.status.unwrap_or(true)),
        refresh_token: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = created.id, "user created");
    load_row(db, created.id).await
}

pub async fn update(
    db: &DatabaseConnection,
    hasher: &dyn PasswordHasher,
    id: i32,
    input: UpdateUser,
) -> Result<UserRow, ApiError> {
    let mut active = find_user(db, id).await?.into_active_model();

    if let Some(email) = input.email {
        let email = normalize_email(&email);
        ensure_email_free(db, &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(password) = input.password {
        active.password = Set(hasher.hash(&password)?);
    }
    if let Some(role_id) = input.role_id {
        ensure_role_exists(db, role_id).await?;
        active.role_id = Set(role_id);
    }
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Some(Utc::now()));
    active.update(db).await?;

    load_row(db, id).await
}

/// Soft delete; returns the deactivated row.
pub async fn remove(db: &DatabaseConnection, id: i32) -> Result<UserRow, ApiError> {
    UserRow::soft_delete(db, id).await?;
    load_row(db, id).await
}

/// Check `password` against the stored digest of `user_id`. Unknown users never match.
pub async fn verify_password(
    db: &DatabaseConnection,
    hasher: &dyn PasswordHasher,
    user_id: i32,
    password: &str,
) -> Result<bool, ApiError> {
    match user::Entity::find_by_id(user_id).one(db).await? {
        Some(user) => Ok(hasher.verify(password, &user.password)?),
        None => Ok(false),
    }
}

pub async fn change_password(
    db: &DatabaseConnection,
    hasher: &dyn PasswordHasher,
    id: i32,
    password: &str,
) -> Result<UserRow, ApiError> {
    let mut active = find_user(db, id).await?.into_active_model();
    active.password = Set(hasher.hash(password)?);
    active.updated_at = Set(Some(Utc::now()));
    active.update(db).await?;
    load_row(db, id).await
}

pub async fn update_role(db: &DatabaseConnection, id: i32, role_id: i32) -> Result<UserRow, ApiError> {
    let mut active = find_user(db, id).await?.into_active_model();
    ensure_role_exists(db, role_id).await?;
    active.role_id = Set(role_id);
    active.updated_at = Set(Some(Utc::now()));
    active.update(db).await?;
    load_row(db, id).await
}

/// `None` when the user has no linked profile.
pub async fn get_profile(db: &DatabaseConnection, id: i32) -> Result<Option<ProfileRow>, ApiError> {
    find_user(db, id).await?;
    Ok(linked_profile(db, id).await?.map(ProfileRow::from))
}

/// Link `profile_id` to the user, releasing any profile linked before.
pub async fn link_profile(db: &DatabaseConnection, id: i32, profile_id: i32) -> Result<UserDetail, ApiError> {
    find_user(db, id).await?;

    let txn = db.begin().await?;
    let profile = profile_user::Entity::find_by_id(profile_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile", Some(profile_id.to_string())))?;

    if profile.user_id.is_some_and(|owner| owner != id) {
        return Err(ApiError::conflict("profile is already linked to another user"));
    }

    profile_user::Entity::update_many()
        .col_expr(profile_user::Column::UserId, Expr::value(Option::<i32>::None))
        .col_expr(profile_user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(profile_user::Column::UserId.eq(id))
        .filter(profile_user::Column::Id.ne(profile_id))
        .exec(&txn)
        .await?;

    let mut active = profile.into_active_model();
    active.user_id = Set(Some(id));
    active.updated_at = Set(Some(Utc::now()));
    active.update(&txn).await?;
    txn.commit().await?;

    get_by_id(db, id).await
}

/// Detach the user's profile, if any; the profile's owner becomes NULL.
pub async fn unlink_profile(db: &DatabaseConnection, id: i32) -> Result<UserDetail, ApiError> {
    let user = load_row(db, id).await?;
    if let Some(profile) = linked_profile(db, id).await? {
        let mut active = profile.into_active_model();
        active.user_id = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;
    }
    Ok(UserDetail { user, profile: None })
}

pub async fn update_status(db: &DatabaseConnection, id: i32, status: bool) -> Result<UserRow, ApiError> {
    match UserRow::set_status(db, &[id], status).await? {
        0 => Err(user_not_found(id)),
        _ => load_row(db, id).await,
    }
}

pub async fn bulk_update_status(db: &DatabaseConnection, ids: &[i32], status: bool) -> Result<u64, ApiError> {
    UserRow::set_status(db, ids, status).await
}
