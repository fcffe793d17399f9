//! laudos-api library - radiology report authoring backend
//!
//! Per-user report templates, phrases and variables over HTTP, bearer-token
//! authentication and report generation through a hosted language model.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use laudos_common::api::TokenService;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod extract;
pub mod services;

use services::ai::AiProvider;
use services::ReportService;

/// Report generation wiring
#[derive(Clone)]
pub struct AiState {
    /// Configured provider (reported even when it has no key)
    pub provider: AiProvider,
    /// Providers with an API key present
    pub available: Vec<AiProvider>,
    /// `None` when the configured provider cannot be used
    pub reports: Option<Arc<ReportService>>,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            provider: AiProvider::OpenRouter,
            available: Vec::new(),
            reports: None,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Bearer token issue/validation
    pub tokens: Arc<TokenService>,
    pub ai: AiState,
    /// Account whose content is copied to new users
    pub seed_user_email: Option<String>,
    /// Allowed CORS origins (empty = any)
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, tokens: TokenService) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
            ai: AiState::default(),
            seed_user_email: None,
            cors_allowed_origins: Vec::new(),
        }
    }

    pub fn with_ai(mut self, ai: AiState) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_seed_user(mut self, email: Option<String>) -> Self {
        self.seed_user_email = email;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = origins;
        self
    }
}

/// Build application router
///
/// `/health` and the register/login/refresh endpoints are public; everything
/// else under `/api` requires an access token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .merge(api::metodos::routes())
        .merge(api::modelos::routes())
        .merge(api::frases::routes())
        .merge(api::variaveis::routes())
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/gerar_laudo", post(api::laudo::gerar_laudo))
        .route("/api/ai/status", get(api::laudo::ai_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/refresh", post(api::auth::refresh))
        .merge(api::health_routes());

    let cors = cors_layer(&state.cors_allowed_origins);

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(parsed))
}
