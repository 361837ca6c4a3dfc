#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use chrono::{DateTime, Utc};
use rolecrate::{
    AppState, Config,
    audit::{AuditSink, MemoryAuditSink},
    auth::{Argon2Hasher, PasswordHasher, TokenKind},
    build_app,
    entities::{permission, role, role_permission, user},
    migration::Migrator,
    seed::{SUPER_ADMIN_ROLE, seed},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub audit: MemoryAuditSink,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Migrated and seeded database, fast password hashing, in-memory audit sink
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Config::default()).await
}

pub async fn setup_test_app_with(config: Config) -> TestApp {
    let db = setup_test_db().await.expect("Failed to setup test database");
    seed(&db).await.expect("Failed to seed test database");

    let audit = MemoryAuditSink::default();
    let state = AppState::new(db, config)
        .with_passwords(Arc::new(Argon2Hasher::fast().expect("argon2 params")))
        .with_audit(Arc::new(audit.clone()));

    TestApp {
        app: build_app(state.clone()),
        state,
        audit,
    }
}

impl TestApp {
    /// Same database and token keys, different audit sink
    pub fn with_audit_sink(self, sink: Arc<dyn AuditSink>) -> TestApp {
        let state = self.state.with_audit(sink);
        TestApp {
            app: build_app(state.clone()),
            state,
            audit: self.audit,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Role holding exactly the named permissions, created on the fly
    pub async fn create_role(&self, name: &str, permission_names: &[&str]) -> role::Model {
        let role = role::ActiveModel {
            name: Set(name.to_string()),
            status: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap();

        for permission_name in permission_names {
            let permission = self.permission(permission_name).await;
            role_permission::ActiveModel {
                role_id: Set(role.id),
                permission_id: Set(permission.id),
                status: Set(true),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(self.db())
            .await
            .unwrap();
        }
        role
    }

    pub async fn permission(&self, name: &str) -> permission::Model {
        permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .one(self.db())
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("permission {name} not seeded"))
    }

    pub async fn super_admin_role(&self) -> role::Model {
        role::Entity::find()
            .filter(role::Column::Name.eq(SUPER_ADMIN_ROLE))
            .one(self.db())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn create_user(&self, email: &str, password: &str, role_id: i32) -> user::Model {
        self.create_user_at(email, password, role_id, Utc::now()).await
    }

    pub async fn create_user_at(&self, email: &str, password: &str, role_id: i32, created_at: DateTime<Utc>) -> user::Model {
        user::ActiveModel {
            email: Set(email.to_string()),
            password: Set(self.state.passwords.hash(password).unwrap()),
            role_id: Set(role_id),
            status: Set(true),
            refresh_token: Set(None),
            created_at: Set(created_at),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap()
    }

    pub fn access_token(&self, user: &user::Model) -> String {
        self.state
            .tokens
            .sign(TokenKind::Access, user.id, &user.email)
            .unwrap()
            .token
    }

    /// Access token of a fresh `SuperAdmin` user
    pub async fn admin_token(&self) -> String {
        let role = self.super_admin_role().await;
        let admin = self.create_user("root@example.com", "rootpass", role.id).await;
        self.access_token(&admin)
    }

    /// Access token of a fresh user whose role holds only `permission_names`
    pub async fn token_with(&self, email: &str, permission_names: &[&str]) -> String {
        let role = self.create_role(&format!("role-for-{email}"), permission_names).await;
        let user = self.create_user(email, "secret1", role.id).await;
        self.access_token(&user)
    }
}
