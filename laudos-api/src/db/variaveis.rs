//! Template variable queries

use laudos_common::db::Variavel;
use laudos_common::Result;
use serde_json::Value;
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, titulo_variavel, variavel, usuario_id, criado_em, atualizado_em";

/// Fields accepted on update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct VariavelChanges {
    pub titulo_variavel: Option<String>,
    pub variavel: Option<Value>,
}

/// A user's variables, optionally only those with an exact title
pub async fn list_variaveis(
    pool: &SqlitePool,
    usuario_id: i64,
    titulo: Option<&str>,
) -> Result<Vec<Variavel>> {
    let rows = match titulo {
        Some(titulo) => {
            sqlx::query(&format!(
                "SELECT {} FROM variaveis WHERE usuario_id = ? AND titulo_variavel = ? ORDER BY id",
                COLUMNS
            ))
            .bind(usuario_id)
            .bind(titulo)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM variaveis WHERE usuario_id = ? ORDER BY id",
                COLUMNS
            ))
            .bind(usuario_id)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(Variavel::from_row).collect()
}

pub async fn get_variavel(pool: &SqlitePool, id: i64, usuario_id: i64) -> Result<Option<Variavel>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM variaveis WHERE id = ? AND usuario_id = ?",
        COLUMNS
    ))
    .bind(id)
    .bind(usuario_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Variavel::from_row).transpose()
}

pub async fn create_variavel<'e, E>(
    executor: E,
    usuario_id: i64,
    titulo_variavel: &str,
    variavel: &Value,
) -> Result<Variavel>
where
    E: SqliteExecutor<'e>,
{
    let now = laudos_common::time::now();
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO variaveis (titulo_variavel, variavel, usuario_id, criado_em, atualizado_em)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(titulo_variavel)
    .bind(serde_json::to_string(variavel)?)
    .bind(usuario_id)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Variavel::from_row(&row)
}

pub async fn update_variavel(
    pool: &SqlitePool,
    id: i64,
    usuario_id: i64,
    changes: &VariavelChanges,
) -> Result<Option<Variavel>> {
    let payload = changes.variavel.as_ref().map(serde_json::to_string).transpose()?;

    let row = sqlx::query(&format!(
        r#"
        UPDATE variaveis SET
            titulo_variavel = COALESCE(?, titulo_variavel),
            variavel = COALESCE(?, variavel),
            atualizado_em = ?
        WHERE id = ? AND usuario_id = ?
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(changes.titulo_variavel.as_deref())
    .bind(payload)
    .bind(laudos_common::time::now())
    .bind(id)
    .bind(usuario_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Variavel::from_row).transpose()
}

pub async fn delete_variavel(pool: &SqlitePool, id: i64, usuario_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM variaveis WHERE id = ? AND usuario_id = ?")
        .bind(id)
        .bind(usuario_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
