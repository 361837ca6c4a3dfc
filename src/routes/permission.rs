//! `/admin/permission`

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};

use super::{ListQuery, ListResponse, ValidatedJson, list_response};
use crate::audit::{AuditModule, record};
use crate::auth::{PermissionVerb, require_permission};
use crate::errors::ApiError;
use crate::resources::PermissionRow;
use crate::services::permissions::{self, CreatePermission, UpdatePermission};
use crate::state::AppState;

const MODULE: &str = "permission";

pub fn router(state: &AppState) -> Router<AppState> {
    let audited =
        |action: &'static str| middleware::from_fn_with_state(state.clone(), record(AuditModule::Permission, action));

    let read_routes = Router::new()
        .route("/", get(list).layer(audited("getAll")))
        .route("/getAll", get(list_all).layer(audited("getAll")))
        .route("/{id}", get(get_by_id).layer(audited("getById")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Read)));

    let create_routes = Router::new()
        .route("/", post(create).layer(audited("create")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Create)));

    let edit_routes = Router::new()
        .route("/{id}", put(update).layer(audited("update")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Edit)));

    let delete_routes = Router::new()
        .route("/{id}", delete(remove).layer(audited("remove")))
        .route_layer(middleware::from_fn(require_permission(MODULE, PermissionVerb::Delete)));

    read_routes
        .merge(create_routes)
        .merge(edit_routes)
        .merge(delete_routes)
}

async fn list(
    State(state): State<AppState>,
    ListQuery(params): ListQuery,
) -> Result<ListResponse<PermissionRow>, ApiError> {
    let page = permissions::list(&state.db, &params).await?;
    Ok(list_response(&params, page))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<PermissionRow>>, ApiError> {
    permissions::list_all(&state.db).await.map(Json)
}

async fn get_by_id(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<PermissionRow>, ApiError> {
    permissions::get_by_id(&state.db, id).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreatePermission>,
) -> Result<(StatusCode, Json<PermissionRow>), ApiError> {
    let permission = permissions::create(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<UpdatePermission>,
) -> Result<Json<PermissionRow>, ApiError> {
    permissions::update(&state.db, id, input).await.map(Json)
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<PermissionRow>, ApiError> {
    permissions::remove(&state.db, id).await.map(Json)
}
