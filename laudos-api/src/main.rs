//! laudos-api - radiology report authoring backend
//!
//! Startup order: `.env`, CLI, TOML config, logging, database, token signing
//! secret, AI provider, HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use laudos_common::api::{load_signing_secret, TokenService};
use laudos_common::config::{self, resolve_secret, TomlConfig};
use laudos_common::db::init_database;
use laudos_api::services::ai::{build_generator, AiError, AiSettings};
use laudos_api::services::response_cache::NoCache;
use laudos_api::services::{InMemoryCache, ReportService, ResponseCache};
use laudos_api::{build_router, AiState, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const JWT_SECRET_ENV: &str = "LAUDOS_JWT_SECRET";

/// Command-line arguments for laudos-api
#[derive(Parser, Debug)]
#[command(name = "laudos-api")]
#[command(about = "Radiology report authoring backend")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LAUDOS_PORT")]
    port: Option<u16>,

    /// Interface to bind to
    #[arg(short, long, env = "LAUDOS_BIND_ADDRESS")]
    bind: Option<String>,

    /// Folder holding laudos.db
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "LAUDOS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    let loaded = TomlConfig::load(args.config.as_deref());

    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("laudos_api={level},laudos_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup step
    info!(
        "Starting Laudos API (laudos-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = loaded.context("Failed to load configuration")?;

    let data_folder = config::resolve_data_folder(args.data_folder.as_deref(), &config);
    let db_path = config::database_path(&data_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let secret = match resolve_secret(JWT_SECRET_ENV, config.auth.jwt_secret.as_deref()) {
        Some((secret, source)) => {
            info!("Token signing secret loaded from {}", source);
            secret
        }
        None => {
            let secret = load_signing_secret(&pool)
                .await
                .context("Failed to load token signing secret")?;
            info!("Token signing secret loaded from database");
            secret
        }
    };
    let (access_ttl, refresh_ttl) = config
        .auth
        .token_lifetimes()
        .context("Invalid token lifetime configuration")?;
    let tokens = TokenService::new(&secret, access_ttl, refresh_ttl);

    let ai = build_ai_state(&AiSettings::resolve(&config.ai).context("Invalid AI configuration")?)?;

    let seed_user_email = config
        .seed_user_email
        .as_deref()
        .map(laudos_common::api::auth::normalize_email)
        .filter(|email| !email.is_empty());
    if let Some(email) = &seed_user_email {
        info!("New accounts receive starter content from {}", email);
    }

    let state = AppState::new(pool, tokens)
        .with_ai(ai)
        .with_seed_user(seed_user_email)
        .with_cors_origins(config.cors_allowed_origins.clone());
    let app = build_router(state);

    let bind = args
        .bind
        .or(config.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("laudos-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wire the configured provider; a missing key disables generation only
fn build_ai_state(settings: &AiSettings) -> Result<AiState> {
    let reports = match build_generator(settings) {
        Ok(generator) => {
            info!(
                provider = %settings.provider,
                model = %settings.model,
                cache_ttl_secs = settings.cache_ttl.as_secs(),
                "Report generation enabled"
            );
            // cache_ttl_secs = 0 turns caching off
            let cache: Arc<dyn ResponseCache> = if settings.cache_ttl.is_zero() {
                Arc::new(NoCache)
            } else {
                Arc::new(InMemoryCache::new())
            };
            let service = ReportService::new(generator, cache, settings.cache_ttl)
                .with_medical_context(settings.medical_context);
            Some(Arc::new(service))
        }
        Err(AiError::MissingApiKey(_)) => None,
        Err(e) => return Err(e).context("Failed to build AI client"),
    };

    Ok(AiState {
        provider: settings.provider,
        available: settings.available.clone(),
        reports,
    })
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
