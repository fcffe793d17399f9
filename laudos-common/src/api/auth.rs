//! Authentication primitives: password hashing and signed bearer tokens
//!
//! # Architecture
//!
//! - Passwords are stored as Argon2id PHC strings
//! - Tokens are HS256 JWTs carrying the user id (`sub`) and a `token_type`
//! - An access/refresh pair is issued at login; only access tokens open
//!   protected routes, only refresh tokens mint new access tokens
//! - Validation is stateless: no server-side session store
//!
//! This module contains ONLY pure functions and database operations.
//! No HTTP framework dependencies; the axum middleware lives in the service.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use sqlx::SqlitePool;

/// Settings key holding the persisted signing secret
pub const SIGNING_SECRET_SETTING: &str = "jwt_signing_secret";

const GENERATED_SECRET_LEN: usize = 64;

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Signature, structure or claims invalid
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token past its `exp`
    #[error("Token expired")]
    Expired,

    /// Refresh token used as access token or vice versa
    #[error("Wrong token type: expected {expected}, found {found}")]
    WrongTokenType {
        expected: TokenType,
        found: TokenType,
    },

    /// Token could not be signed
    #[error("Token encoding failed: {0}")]
    Encoding(String),

    /// Password hashing failure or malformed stored hash
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Database error loading the signing secret
    #[error("Database error: {0}")]
    DatabaseError(String),
}

// ========================================
// Claims
// ========================================

/// Token purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id (decimal string)
    pub sub: String,
    pub email: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    /// User id carried in `sub`
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken(format!("Invalid subject: {}", self.sub)))
    }
}

/// Access + refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// ========================================
// Token Service
// ========================================

/// Issues and validates HS256 tokens with fixed lifetimes
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Sign a token of the given type for a user
    pub fn issue(&self, user_id: i64, email: &str, token_type: TokenType) -> Result<String, AuthError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(user_id, email, token_type, ttl)
    }

    /// Sign a token with an explicit lifetime (negative = already expired)
    pub fn issue_with_ttl(
        &self,
        user_id: i64,
        email: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type,
            iat: crate::time::now().timestamp(),
            exp: crate::time::unix_after(ttl),
            jti: Uuid::new_v4().to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Issue the login pair
    pub fn issue_pair(&self, user_id: i64, email: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, email, TokenType::Access)?,
            refresh: self.issue(user_id, email, TokenType::Refresh)?,
        })
    }

    /// Verify signature and expiry, then check the token type
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        if data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected,
                found: data.claims.token_type,
            });
        }

        Ok(data.claims)
    }

    /// Mint a new access token from a valid refresh token
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.validate(refresh_token, TokenType::Refresh)?;
        let user_id = claims.user_id()?;
        self.issue(user_id, &claims.email, TokenType::Access)
    }
}

// ========================================
// Signing Secret Management
// ========================================

/// Generate a random alphanumeric signing secret
pub fn generate_signing_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Load the persisted signing secret, generating and storing one if absent
///
/// Used when no secret is supplied via environment or TOML, so tokens
/// survive restarts without manual setup.
pub async fn load_signing_secret(db: &SqlitePool) -> Result<String, AuthError> {
    let existing = crate::db::get_setting(db, SIGNING_SECRET_SETTING)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    match existing {
        Some(secret) if crate::config::is_valid_key(&secret) => Ok(secret),
        _ => initialize_signing_secret(db).await,
    }
}

/// Generate and persist a new signing secret (invalidates all issued tokens)
pub async fn initialize_signing_secret(db: &SqlitePool) -> Result<String, AuthError> {
    let secret = generate_signing_secret();

    crate::db::set_setting(db, SIGNING_SECRET_SETTING, &secret)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Passwords
// ========================================

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a PHC-format hash string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Canonical form of a login email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal structural email check: `local@domain.tld`, no whitespace
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

// ========================================
// Tests
// ========================================
