//! HTTP API handlers for laudos-api

pub mod auth;
pub mod frases;
pub mod health;
pub mod laudo;
pub mod metodos;
pub mod modelos;
pub mod variaveis;

pub use auth::{auth_middleware, CurrentUser};
pub use health::health_routes;
