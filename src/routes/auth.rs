//! `/auth`: registration, login and token lifecycle.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::ValidatedJson;
use crate::auth::{Principal, require_auth, token::bearer_token};
use crate::errors::ApiError;
use crate::services::auth::{self, LoginInput, RefreshInput, RegisterInput, Session, TokenInfo};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token));

    let session = Router::new()
        .route("/logout", post(logout))
        .route("/token", get(token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new().nest("/auth", public.merge(session))
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = auth::register(&state.db, state.passwords.as_ref(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "user": user })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LoginInput>,
) -> Result<Json<Session>, ApiError> {
    auth::login(&state.db, state.passwords.as_ref(), state.tokens.as_ref(), input)
        .await
        .map(Json)
}

async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RefreshInput>,
) -> Result<Json<Session>, ApiError> {
    auth::refresh(&state.db, state.tokens.as_ref(), &input.refresh_token)
        .await
        .map(Json)
}

async fn logout(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>, ApiError> {
    auth::logout(&state.db, principal.user_id).await?;
    tracing::info!(user_id = principal.user_id, "user logged out");
    Ok(Json(json!({ "message": "logged out" })))
}

async fn token(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<TokenInfo>, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
    auth::token_info(state.tokens.as_ref(), token).map(Json)
}
