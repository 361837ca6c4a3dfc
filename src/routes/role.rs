//! `/admin/role`

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, put},
};

use super::{ListQuery, ListResponse, ValidatedJson, list_response};
use crate::audit::{AuditModule, record};
use crate::auth::{PermissionVerb, require_permission};
use crate::errors::ApiError;
use crate::resources::{RolePermissionRow, RoleRow};
use crate::services::roles::{self, CreateRole, RolePermissionInput, UpdateRole};
use crate::services::{BulkStatusResult, BulkStatusUpdate, StatusUpdate};
use crate::state::AppState;

const MODULE: &str = "role";

pub fn router(state: &AppState) -> Router<AppState> {
    let audited = |action: &'static str| middleware::from_fn_with_state(state.clone(), record(AuditModule::Role, action));

    let read_routes = Router::new()
        .route("/", get(list).layer(audited("getAll")))
        .route("/{id}", get(get_by_id).layer(audited("getById")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Read)));

    let create_routes = Router::new()
        .route("/", post(create).layer(audited("create")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Create)));

    let edit_routes = Router::new()
        .route("/{id}", put(update).layer(audited("update")))
        .route("/{id}", patch(update_status).layer(audited("updateStatus")))
        .route("/assign-permission", post(assign_permission).layer(audited("assignPermission")))
        .route("/remove-permission", post(remove_permission).layer(audited("removePermission")))
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

async fn list(State(state): State<AppState>, ListQuery(params): ListQuery) -> Result<ListResponse<RoleRow>, ApiError> {
    let page = roles::list(&state.db, &params).await?;
    Ok(list_response(&params, page))
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<RoleRow>, ApiError> {
    roles::get_by_id(&state.db, id).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateRole>,
) -> Result<(StatusCode, Json<RoleRow>), ApiError> {
    let role = roles::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<UpdateRole>,
) -> Result<Json<RoleRow>, ApiError> {
    roles::update(&state.db, id, input).await.map(Json)
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<RoleRow>, ApiError> {
    roles::remove(&state.db, id).await.map(Json)
}

async fn assign_permission(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RolePermissionInput>,
) -> Result<Json<RolePermissionRow>, ApiError> {
    roles::assign_permission(&state.db, &input).await.map(Json)
}

async fn remove_permission(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RolePermissionInput>,
) -> Result<Json<RolePermissionRow>, ApiError> {
    roles::remove_permission(&state.db, &input).await.map(Json)
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<StatusUpdate>,
) -> Result<Json<RoleRow>, ApiError> {
    roles::update_status(&state.db, id, input.status).await.map(Json)
}

async fn bulk_update_status(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<BulkStatusUpdate>,
) -> Result<Json<BulkStatusResult>, ApiError> {
    let updated = roles::bulk_update_status(&state.db, &input.ids, input.status).await?;
    Ok(Json(BulkStatusResult { updated }))
}
