use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::openapi::openapi_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/openapi.json", get(openapi_json))
}

async fn health() -> Json<Value> {
    Json(json!({
        "message": "rolecrate admin API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
