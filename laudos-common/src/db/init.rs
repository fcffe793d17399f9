//! Database initialization
//!
//! Creates the database file on first run, applies the base schema with
//! `CREATE TABLE IF NOT EXISTS` and then runs versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL allows concurrent readers alongside one writer
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Single connection that never expires: each SQLite memory connection is
/// its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_metodos_table(pool).await?;
    create_modelos_laudo_table(pool).await?;
    create_frases_table(pool).await?;
    create_frases_modelos_laudo_table(pool).await?;
    create_variaveis_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (e.g. the persisted token signing secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            nome_completo TEXT NOT NULL,
            telefone TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_metodos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metodos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metodo TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_modelos_laudo_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS modelos_laudo (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo TEXT NOT NULL,
            texto TEXT NOT NULL,
            metodo_id INTEGER NOT NULL REFERENCES metodos(id) ON DELETE CASCADE,
            usuario_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            criado_em TIMESTAMP NOT NULL,
            atualizado_em TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_frases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            categoria_frase TEXT NOT NULL,
            titulo_frase TEXT NOT NULL,
            frase TEXT NOT NULL,
            usuario_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            criado_em TIMESTAMP NOT NULL,
            atualizado_em TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Phrase <-> template membership (no attributes)
async fn create_frases_modelos_laudo_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frases_modelos_laudo (
            frase_id INTEGER NOT NULL REFERENCES frases(id) ON DELETE CASCADE,
            modelo_laudo_id INTEGER NOT NULL REFERENCES modelos_laudo(id) ON DELETE CASCADE,
            PRIMARY KEY (frase_id, modelo_laudo_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_variaveis_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS variaveis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo_variavel TEXT NOT NULL,
            variavel TEXT NOT NULL,
            usuario_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            criado_em TIMESTAMP NOT NULL,
            atualizado_em TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Read a value from the settings table
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Insert or replace a value in the settings table
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
