//! # Laudos Common Library
//!
//! Shared code for the Laudos backend:
//! - Database schema, migrations and record models
//! - Authentication primitives (password hashing, bearer tokens)
//! - Configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
