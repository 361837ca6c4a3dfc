use axum::http::{Method, StatusCode};
use rolecrate::entities::user;
use sea_orm::EntityTrait;
use serde_json::json;

mod common;
use common::setup_test_app;

#[tokio::test]
async fn test_register_then_login() {
    let app = setup_test_app().await;

    let res = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({"email": "  Ada@Example.com ", "password": "secret1", "role": "SuperAdmin"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["email"], "ada@example.com");

    let res = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(res.body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(res.body["tokenInfo"]["payload"]["typ"], "access");
    assert_eq!(res.body["tokenInfo"]["payload"]["email"], "ada@example.com");

    // the refresh token is remembered on the user row
    let id = res.body["user"]["id"].as_i64().unwrap();
    let stored = user::Entity::find_by_id(i32::try_from(id).unwrap())
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token.as_deref(), res.body["refreshToken"].as_str());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_unknown_roles() {
    let app = setup_test_app().await;
    let role = app.super_admin_role().await;
    app.create_user("taken@example.com", "secret1", role.id).await;

    let res = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({"email": "TAKEN@example.com", "password": "secret1", "role": "SuperAdmin"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({"email": "new@example.com", "password": "secret1", "role": "Nobody"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "role does not exist");
}

#[tokio::test]
async fn test_register_validation() {
    let app = setup_test_app().await;

    let res = app
        .post("/api/v1/auth/register", None, json!({"email": "not-an-email", "password": "123", "role": "SuperAdmin"}))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["details"].as_array().unwrap().len(), 2);

    let res = app
        .request(Method::POST, "/api/v1/auth/register", None, Some(json!("just a string")))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = setup_test_app().await;
    let role = app.super_admin_role().await;
    app.create_user("ada@example.com", "secret1", role.id).await;

    let wrong_password = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "nope-nope"}))
        .await;
    let unknown = app
        .post("/api/v1/auth/login", None, json!({"email": "who@example.com", "password": "secret1"}))
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown.body);
    assert_eq!(unknown.body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;
    let role = app.super_admin_role().await;
    let ada = app.create_user("ada@example.com", "secret1", role.id).await;

    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/user/{}", ada.id),
            Some(&token),
            Some(json!({"status": false})),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = setup_test_app().await;
    let role = app.super_admin_role().await;
    app.create_user("ada@example.com", "secret1", role.id).await;

    let login = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    let first = login.body["refreshToken"].as_str().unwrap().to_string();

    let res = app
        .post("/api/v1/auth/refresh-token", None, json!({"refreshToken": first}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let second = res.body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    // the previous refresh token no longer matches the stored one
    let res = app
        .post("/api/v1/auth/refresh-token", None, json!({"refreshToken": first}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post("/api/v1/auth/refresh-token", None, json!({"refreshToken": "garbage"}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let app = setup_test_app().await;
    let role = app.super_admin_role().await;
    app.create_user("ada@example.com", "secret1", role.id).await;

    let login = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    let access = login.body["accessToken"].as_str().unwrap();

    let res = app
        .post("/api/v1/auth/refresh-token", None, json!({"refreshToken": access}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_clears_refresh_token() {
    let app = setup_test_app().await;
    let role = app.super_admin_role().await;
    app.create_user("ada@example.com", "secret1", role.id).await;

    let login = app
        .post("/api/v1/auth/login", None, json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    let access = login.body["accessToken"].as_str().unwrap().to_string();
    let refresh = login.body["refreshToken"].as_str().unwrap().to_string();

    let res = app.post("/api/v1/auth/logout", Some(&access), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .post("/api/v1/auth/refresh-token", None, json!({"refreshToken": refresh}))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.request(Method::POST, "/api/v1/auth/logout", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_info() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;

    let res = app.get("/api/v1/auth/token", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["payload"]["email"], "root@example.com");
    assert!(res.body["expiresAt"].is_string());

    let res = app.get("/api/v1/auth/token", "not.a.jwt").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup_test_app().await;

    let res = app.request(Method::GET, "/api/v1", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["message"].is_string());

    let res = app.request(Method::GET, "/api/v1/openapi.json", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["components"]["schemas"]["UserRow"].is_object());
    let listing = res.body["components"]["schemas"]["UserRow"]["description"].as_str().unwrap();
    assert!(listing.contains("roleId"), "{listing}");
}
