//! Shared API request/response types
//!
//! Request bodies use `Option` fields so that a missing field becomes a
//! validation message instead of an extractor rejection.

use serde::{Deserialize, Serialize};

use crate::db::User;

// ========================================
// Authentication Types
// ========================================

/// `POST /api/auth/register` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub nome_completo: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
}

/// `POST /api/auth/login` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/refresh` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub nome_completo: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nome_completo: user.nome_completo.clone(),
        }
    }
}

/// Login / registration response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    pub refresh: String,
    pub access: String,
    pub user: UserSummary,
}

/// Refresh response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessResponse {
    pub access: String,
}

// ========================================
// Error Response Types
// ========================================

/// Error body returned by every endpoint: `{"error": "..."}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ========================================
// Tests
// ========================================
