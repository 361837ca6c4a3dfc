//! HTTP surface under `/api/v1`.
//!
//! ```text
//! TraceLayer ─► CORS ─► date formatting ─► router
//!                                            ├─ /            health
//!                                            ├─ /auth/*      public + bearer
//!                                            └─ /admin/*     require_auth ─► require_permission ─► audit ─► handler
//! ```

pub mod auth;
pub mod extract;
pub mod health;
pub mod permission;
pub mod role;
pub mod user;

use axum::{Json, Router, http::HeaderMap, middleware};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::filtering::ListParams;
use crate::pagination::{PageFetchResult, ServerResponse, calculate_content_range, shape};
use crate::response::format_dates;
use crate::state::AppState;
use crate::traits::ListResource;

pub use extract::{ListQuery, ValidatedJson};

/// List envelope plus its `Content-Range` header
pub type ListResponse<T> = (HeaderMap, Json<ServerResponse<T>>);

pub(crate) fn list_response<T: ListResource>(params: &ListParams, page: PageFetchResult<T>) -> ListResponse<T> {
    let returned = u64::try_from(page.data.len()).unwrap_or(u64::MAX);
    let headers = calculate_content_range(params.offset(), returned, page.total, T::RESOURCE_NAME_PLURAL);
    (headers, Json(shape(page, params.page, params.page_size)))
}

/// Every route, without global middleware or state
pub fn build_router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .nest("/user", user::router(state))
        .nest("/role", role::router(state))
        .nest("/permission", permission::router(state))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(health::router())
        .merge(auth::router(state))
        .nest("/admin", admin);

    Router::new().nest("/api/v1", api)
}

/// Fully configured application, used by the server binary and by tests
pub fn build_app(state: AppState) -> Router {
    let offset = state.config.response_offset;
    build_router(&state)
        .layer(middleware::map_response_with_state(offset, format_dates))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
