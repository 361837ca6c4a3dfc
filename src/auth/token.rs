//! Access and refresh tokens (HS256 JWT), each kind signed with its own secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::TokenSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub claims: Claims,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("expected a {0:?} token")]
    WrongKind(TokenKind),
    #[error("token signing failed: {0}")]
    Signing(String),
}

pub trait TokenIssuer: Send + Sync {
    fn sign(&self, kind: TokenKind, user_id: i32, email: &str) -> Result<IssuedToken, TokenError>;

    fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError>;
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    /// `None` when the configured lifetime does not fit a `Duration`
    ttl: Option<Duration>,
}

impl KeyPair {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::try_seconds(ttl_secs),
        }
    }
}

pub struct JwtIssuer {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl JwtIssuer {
    #[must_use]
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);
        validation.leeway = 0;

        Self {
            access: KeyPair::new(&settings.access_secret, settings.access_ttl_secs),
            refresh: KeyPair::new(&settings.refresh_secret, settings.refresh_ttl_secs),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl TokenIssuer for JwtIssuer {
    fn sign(&self, kind: TokenKind, user_id: i32, email: &str) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let expires_at = keys
            .ttl
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            typ: kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_at,
            claims,
        })
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        if data.claims.typ != kind {
            return Err(TokenError::WrongKind(kind));
        }
        Ok(data.claims)
    }
}

/// Token from an `Authorization: Bearer <token>` header value
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
