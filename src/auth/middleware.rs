//! Authentication and authorization layers.
//!
//! ```ignore
//! Router::new()
//!     .route("/", get(list))
//!     .layer(middleware::from_fn(require_permission("user", PermissionVerb::Read)))
//! ```
//!
//! | failure                              | status |
//! |--------------------------------------|--------|
//! | no `Authorization` header            | 401    |
//! | expired, malformed or unknown token  | 401    |
//! | inactive or deleted user             | 401    |
//! | missing permission                   | 403    |

use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::permission_names::{PermissionVerb, derive_permission_name};
use super::principal::Principal;
use super::token::{TokenError, TokenKind, bearer_token};
use crate::errors::ApiError;
use crate::state::AppState;

/// Verify the bearer access token and place the [`Principal`] in the request
/// extensions.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            tracing::debug!(uri = %req.uri(), "missing bearer token");
            ApiError::unauthorized("authentication required")
        })?;

    let claims = state.tokens.verify(TokenKind::Access, token).map_err(|e| {
        tracing::warn!(error = %e, uri = %req.uri(), "access token rejected");
        match e {
            TokenError::Expired => ApiError::unauthorized("token expired"),
            _ => ApiError::unauthorized("invalid token"),
        }
    })?;

    let principal = Principal::load(&state.db, claims.user_id()?).await?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Answer 403 unless the principal holds the permission derived from
/// `module` and `verb`. Must run inside [`require_auth`].
pub fn require_permission(
    module: &'static str,
    verb: PermissionVerb,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>> + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let principal = req
                .extensions()
                .get::<Principal>()
                .ok_or_else(|| ApiError::unauthorized("authentication required"))?;

            let required = derive_permission_name(module, verb);
            if !principal.can(&required) {
                tracing::warn!(
                    user_id = principal.user_id,
                    required_permission = %required,
                    "permission denied"
                );
                return Err(ApiError::forbidden("forbidden"));
            }

            Ok(next.run(req).await)
        })
    }
}
