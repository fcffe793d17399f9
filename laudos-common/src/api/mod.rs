//! Shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared request/response types
//!
//! The service wraps these with axum extractors and middleware.

pub mod auth;
pub mod types;

pub use auth::{
    hash_password, initialize_signing_secret, load_signing_secret, verify_password, AuthError,
    Claims, TokenPair, TokenService, TokenType,
};
pub use types::{
    AccessResponse, AuthResponse, ErrorResponse, LoginRequest, RefreshRequest, RegisterRequest,
    UserSummary,
};
