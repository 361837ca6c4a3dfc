//! `/admin/user`

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, put},
};

use super::{ListQuery, ListResponse, ValidatedJson, list_response};
use crate::audit::{AuditModule, record};
use crate::auth::{PermissionVerb, Principal, require_permission};
use crate::errors::ApiError;
use crate::resources::{ProfileRow, UserDetail, UserRow};
use crate::services::users::{self, ChangePassword, CreateUser, LinkProfile, PasswordInput, UpdateUser, UpdateUserRole};
use crate::services::{BulkStatusResult, BulkStatusUpdate, StatusUpdate};
use crate::state::AppState;

const MODULE: &str = "user";

pub fn router(state: &AppState) -> Router<AppState> {
    let audited = |action: &'static str| middleware::from_fn_with_state(state.clone(), record(AuditModule::User, action));

    let read_routes = Router::new()
        .route("/", get(list).layer(audited("getAll")))
        .route("/{id}", get(get_by_id).layer(audited("getById")))
        .route("/{id}/profile", get(get_profile).layer(audited("getProfile")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Read)));

    let create_routes = Router::new()
        .route("/", post(create).layer(audited("create")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Create)));

    let edit_routes = Router::new()
        .route("/{id}", put(update).layer(audited("update")))
        .route("/{id}", patch(update_status).layer(audited("updateStatus")))
        .route("/verify-password", post(verify_password).layer(audited("verifyPassword")))
        .route("/{id}/password", put(change_password).layer(audited("changePassword")))
        .route("/{id}/role", post(update_role).layer(audited("updateRole")))
        .route("/{id}/profile", post(link_profile).layer(audited("linkProfile")))
        .route("/{id}/profile", delete(unlink_profile).layer(audited("unlinkProfile")))
        .route("/bulk-status", post(bulk_update_status).layer(audited("bulkUpdateStatus")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Edit)));

    let delete_routes = Router::new()
        .route("/{id}", delete(remove).layer(audited("remove")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Delete)));

    read_routes
        .merge(create_routes)
        .merge(edit_routes)
        .merge(delete_routes)
}

async fn list(State(state): State<AppState>, ListQuery(params): ListQuery) -> Result<ListResponse<UserRow>, ApiError> {
    let page = users::list(&state.db, &params).await?;
    Ok(list_response(&params, page))
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<UserDetail>, ApiError> {
    users::get_by_id(&state.db, id).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> Result<(StatusCode, Json<UserRow>), ApiError> {
    let user = users::create(&state.db, state.passwords.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> Result<Json<UserRow>, ApiError> {
    users::update(&state.db, state.passwords.as_ref(), id, input)
        .await
        .map(Json)
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<UserRow>, ApiError> {
    users::remove(&state.db, id).await.map(Json)
}

/// 204 when the password matches the caller's own, 401 otherwise
async fn verify_password(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(input): ValidatedJson<PasswordInput>,
) -> Result<StatusCode, ApiError> {
    if users::verify_password(&state.db, state.passwords.as_ref(), principal.user_id, &input.password).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::unauthorized("invalid password"))
    }
}

async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<ChangePassword>,
) -> Result<Json<UserRow>, ApiError> {
    users::change_password(&state.db, state.passwords.as_ref(), id, &input.password)
        .await
        .map(Json)
}

async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<UpdateUserRole>,
) -> Result<Json<UserRow>, ApiError> {
    users::update_role(&state.db, id, input.role_id).await.map(Json)
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Option<ProfileRow>>, ApiError> {
    users::get_profile(&state.db, id).await.map(Json)
}

async fn link_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<LinkProfile>,
) -> Result<Json<UserDetail>, ApiError> {
    users::link_profile(&state.db, id, input.profile_id).await.map(Json)
}

async fn unlink_profile(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<UserDetail>, ApiError> {
    users::unlink_profile(&state.db, id).await.map(Json)
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<StatusUpdate>,
) -> Result<Json<UserRow>, ApiError> {
    users::update_status(&state.db, id, input.status).await.map(Json)
}

async fn bulk_update_status(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<BulkStatusUpdate>,
) -> Result<Json<BulkStatusResult>, ApiError> {
    let updated = users::bulk_update_status(&state.db, &input.ids, input.status).await?;
    Ok(Json(BulkStatusResult { updated }))
}
