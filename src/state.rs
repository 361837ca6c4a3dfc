use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::audit::{AuditSink, DbAuditSink};
use crate::auth::{Argon2Hasher, JwtIssuer, PasswordHasher, TokenIssuer};
use crate::config::Config;
use crate::filtering::QueryOptions;

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Production wiring: JWT tokens, Argon2 hashing, audit rows in the same database.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            tokens: Arc::new(JwtIssuer::new(&config.tokens)),
            passwords: Arc::new(Argon2Hasher::default()),
            audit: Arc::new(DbAuditSink::new(db.clone())),
            config: Arc::new(config),
            db,
        }
    }

    #[must_use]
    pub fn with_passwords(mut self, passwords: Arc<dyn PasswordHasher>) -> Self {
        self.passwords = passwords;
        self
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    #[must_use]
    pub fn query_options(&self) -> &QueryOptions {
        &self.config.query
    }
}
