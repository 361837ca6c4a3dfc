//! Authentication primitives and the permission guard.

pub mod middleware;
pub mod password;
pub mod permission_names;
pub mod principal;
pub mod token;

pub use middleware::{require_auth, require_permission};
pub use password::{Argon2Hasher, PasswordError, PasswordHasher};
pub use permission_names::{FULL_PERMISSIONS, PermissionVerb, derive_permission_name, permission_catalog};
pub use principal::Principal;
pub use token::{Claims, IssuedToken, JwtIssuer, TokenError, TokenIssuer, TokenKind};

use crate::errors::ApiError;

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::internal("Password processing failed", Some(err.to_string()))
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::unauthorized("token expired"),
            TokenError::Invalid | TokenError::WrongKind(_) => Self::unauthorized("invalid token"),
            TokenError::Signing(details) => Self::internal("Token signing failed", Some(details)),
        }
    }
}
