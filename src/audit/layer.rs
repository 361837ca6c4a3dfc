use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::{
    RequestExt,
    body::{Body, to_bytes},
    extract::{ConnectInfo, RawPathParams, Request, State},
    http::{HeaderMap, header::USER_AGENT},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::sink::{AuditEntry, AuditModule};
use crate::auth::Principal;
use crate::errors::ApiError;
use crate::state::AppState;

/// Record successful mutations of `module` as `action`.
///
/// Used with `middleware::from_fn_with_state`; place it inside `require_auth`
/// so the acting user is known.
pub fn record(
    module: AuditModule,
    action: &'static str,
) -> impl Fn(State<AppState>, Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone {
    move |State(state): State<AppState>, mut req: Request, next: Next| {
        Box::pin(async move {
            let entity_id = path_id(&mut req).await;
            let user_id = req.extensions().get::<Principal>().map(|p| p.user_id);
            let ip_address = client_ip(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());
            let user_agent = req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let data_before = match entity_id {
                Some(id) => snapshot_or_warn(&state, module, id).await,
                None => None,
            };

            let response = next.run(req).await;
            if !response.status().is_success() {
                return response;
            }

            let (parts, body) = response.into_parts();
            let bytes = match to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = %err, "could not buffer response for audit");
                    return ApiError::internal("Failed to read response", Some(err.to_string())).into_response();
                }
            };
            let mut data_after = serde_json::from_slice::<Value>(&bytes).ok();
            if data_after.is_none()
                && let Some(id) = entity_id
            {
                data_after = snapshot_or_warn(&state, module, id).await;
            }

            let entry = AuditEntry {
                module,
                action,
                user_id,
                entity_id,
                data_before,
                data_after,
                ip_address,
                user_agent,
            };
            let sink = state.audit.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    tracing::warn!(error = %err, module = module.as_str(), action, "audit entry dropped");
                }
            });

            Response::from_parts(parts, Body::from(bytes))
        })
    }
}

async fn path_id(req: &mut Request) -> Option<i32> {
    let params = req.extract_parts::<RawPathParams>().await.ok()?;
    params
        .iter()
        .find(|(key, _)| *key == "id")
        .and_then(|(_, value)| value.parse().ok())
}

async fn snapshot_or_warn(state: &AppState, module: AuditModule, id: i32) -> Option<Value> {
    module.snapshot(&state.db, id).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, module = module.as_str(), id, "audit snapshot failed");
        None
    })
}

/// First `X-Forwarded-For` entry, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        let peer = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(client_ip(&headers, Some(&peer)).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer = ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 4000)));
        assert_eq!(client_ip(&HeaderMap::new(), Some(&peer)).as_deref(), Some("192.168.1.7"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
