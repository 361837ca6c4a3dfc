//! Administrative operations behind the HTTP handlers.
//!
//! Deletes are soft everywhere: the row's `status` flips to `false` through
//! [`ListResource::soft_delete`](crate::traits::ListResource::soft_delete).

pub mod auth;
pub mod permissions;
pub mod roles;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StatusUpdate {
    pub status: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkStatusUpdate {
    #[validate(length(min = 1, message = "at least one id is required"))]
    pub ids: Vec<i32>,
    pub status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkStatusResult {
    pub updated: u64,
}

/// Emails are stored trimmed and lowercased
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}
