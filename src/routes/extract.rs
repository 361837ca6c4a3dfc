//! Request extractors. Each handler declares what it validates through its
//! argument types: `Path<i32>` for params, [`ListQuery`] for list queries and
//! [`ValidatedJson`] for bodies.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::errors::ApiError;
use crate::filtering::ListParams;
use crate::state::AppState;

/// Normalized list query (embedded JSON merged, bracket filters folded)
#[derive(Debug, Clone)]
pub struct ListQuery(pub ListParams);

impl FromRequestParts<AppState> for ListQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::bad_request(format!("invalid query string: {}", e.body_text())))?;

        let raw: Map<String, Value> = pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect();
        ListParams::from_query(raw, state.query_options()).map(Self)
    }
}

/// JSON body that passed its `validator` rules.
///
/// Malformed JSON is a 400; a well-formed body failing validation is a 422
/// listing every failing field.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
