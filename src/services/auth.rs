//! Registration, login and token lifecycle.
//!
//! Access tokens live 15 minutes and refresh tokens 7 days by default. The
//! current refresh token is stored on the user row; refreshing rotates both.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{normalize_email, trimmed};
use crate::auth::{Claims, IssuedToken, PasswordHasher, TokenIssuer, TokenKind};
use crate::entities::{role, user};
use crate::errors::ApiError;

const INVALID_CREDENTIALS: &str = "invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "invalid refresh token";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    /// Role name
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "is required"))]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshInput {
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub email: String,
    pub role_id: i32,
}

impl From<&user::Model> for SessionUser {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email.clone(),
            role_id: model.role_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub payload: Claims,
    pub expires_at: DateTime<Utc>,
}

impl From<&IssuedToken> for TokenInfo {
    fn from(issued: &IssuedToken) -> Self {
        Self {
            payload: issued.claims.clone(),
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
    pub token_info: TokenInfo,
}

/// Create an account under an existing, active role (by name).
pub async fn register(
    db: &DatabaseConnection,
    hasher: &dyn PasswordHasher,
    input: RegisterInput,
) -> Result<SessionUser, ApiError> {
    let email = normalize_email(&input.email);
    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("email already exists"));
    }

    let role = role::Entity::find()
        .filter(role::Column::Name.eq(&input.role))
        .filter(role::Column::Status.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::conflict("role does not exist"))?;

    let created = user::ActiveModel {
        email: Set(email),
        password: Set(hasher.hash(&input.password)?),
        role_id: Set(role.id),
        status: Set(true),
        refresh_token: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = created.id, role = %role.name, "user registered");
    Ok(SessionUser::from(&created))
}

/// Issue both tokens and remember the refresh token on the user row.
async fn open_session(db: &DatabaseConnection, tokens: &dyn TokenIssuer, user: user::Model) -> Result<Session, ApiError> {
    let access = tokens.sign(TokenKind::Access, user.id, &user.email)?;
    let refresh = tokens.sign(TokenKind::Refresh, user.id, &user.email)?;

    let session_user = SessionUser::from(&user);
    let mut active = user.into_active_model();
    active.refresh_token = Set(Some(refresh.token.clone()));
    active.update(db).await?;

    Ok(Session {
        token_info: TokenInfo::from(&access),
        access_token: access.token,
        refresh_token: refresh.token,
        user: session_user,
    })
}

/// Unknown email, inactive account and wrong password all answer the same
/// `Unauthorized`.
pub async fn login(
    db: &DatabaseConnection,
    hasher: &dyn PasswordHasher,
    tokens: &dyn TokenIssuer,
    input: LoginInput,
) -> Result<Session, ApiError> {
    let email = normalize_email(&input.email);
    let Some(user) = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
        .filter(|user| user.status)
    else {
        tracing::debug!("login rejected: unknown or inactive account");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if !hasher.verify(&input.password, &user.password)? {
        tracing::debug!(user_id = user.id, "login rejected: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let session = open_session(db, tokens, user).await?;
    tracing::info!(user_id = session.user.id, "user logged in");
    Ok(session)
}

/// Exchange the stored refresh token for a fresh pair. Any mismatch is `Forbidden`.
pub async fn refresh(db: &DatabaseConnection, tokens: &dyn TokenIssuer, refresh_token: &str) -> Result<Session, ApiError> {
    let claims = tokens.verify(TokenKind::Refresh, refresh_token).map_err(|e| {
        tracing::debug!(error = %e, "refresh token rejected");
        ApiError::forbidden(INVALID_REFRESH_TOKEN)
    })?;
    let user_id = claims.user_id().map_err(|_| ApiError::forbidden(INVALID_REFRESH_TOKEN))?;

    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .filter(|user| user.status && user.refresh_token.as_deref() == Some(refresh_token))
        .ok_or_else(|| ApiError::forbidden(INVALID_REFRESH_TOKEN))?;

    open_session(db, tokens, user).await
}

/// Forget the stored refresh token.
pub async fn logout(db: &DatabaseConnection, user_id: i32) -> Result<(), ApiError> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("User", Some(user_id.to_string())))?;
    let mut active = user.into_active_model();
    active.refresh_token = Set(None);
    active.update(db).await?;
    Ok(())
}

/// Claims and expiry of a valid access token
pub fn token_info(tokens: &dyn TokenIssuer, access_token: &str) -> Result<TokenInfo, ApiError> {
    let payload = tokens.verify(TokenKind::Access, access_token)?;
    let expires_at = payload
        .expires_at()
        .ok_or_else(|| ApiError::unauthorized("invalid token"))?;
    Ok(TokenInfo { payload, expires_at })
}
