//! Report template queries

use laudos_common::db::ModeloLaudo;
use laudos_common::Result;
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, titulo, texto, metodo_id, usuario_id, criado_em, atualizado_em";

/// Fields accepted on update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct ModeloChanges {
    pub titulo: Option<String>,
    pub texto: Option<String>,
    pub metodo: Option<i64>,
}

pub async fn list_modelos(pool: &SqlitePool, usuario_id: i64) -> Result<Vec<ModeloLaudo>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM modelos_laudo WHERE usuario_id = ? ORDER BY id",
        COLUMNS
    ))
    .bind(usuario_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(ModeloLaudo::from_row).collect::<sqlx::Result<_>>()?)
}

/// Template by id, only if owned by `usuario_id`
pub async fn get_modelo<'e, E>(executor: E, id: i64, usuario_id: i64) -> Result<Option<ModeloLaudo>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM modelos_laudo WHERE id = ? AND usuario_id = ?",
        COLUMNS
    ))
    .bind(id)
    .bind(usuario_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(ModeloLaudo::from_row).transpose()?)
}

/// Templates among `ids` owned by `usuario_id`
pub async fn count_owned<'e, E>(executor: E, ids: &[i64], usuario_id: i64) -> Result<usize>
where
    E: SqliteExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM modelos_laudo WHERE usuario_id = ? AND id IN ({})",
        placeholders
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(usuario_id);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_one(executor).await? as usize)
}

pub async fn create_modelo<'e, E>(
    executor: E,
    usuario_id: i64,
    titulo: &str,
    texto: &str,
    metodo_id: i64,
) -> Result<ModeloLaudo>
where
    E: SqliteExecutor<'e>,
{
    let now = laudos_common::time::now();
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO modelos_laudo (titulo, texto, metodo_id, usuario_id, criado_em, atualizado_em)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(titulo)
    .bind(texto)
    .bind(metodo_id)
    .bind(usuario_id)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(ModeloLaudo::from_row(&row)?)
}

pub async fn update_modelo(
    pool: &SqlitePool,
    id: i64,
    usuario_id: i64,
    changes: &ModeloChanges,
) -> Result<Option<ModeloLaudo>> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE modelos_laudo SET
            titulo = COALESCE(?, titulo),
            texto = COALESCE(?, texto),
            metodo_id = COALESCE(?, metodo_id),
            atualizado_em = ?
        WHERE id = ? AND usuario_id = ?
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(changes.titulo.as_deref())
    .bind(changes.texto.as_deref())
    .bind(changes.metodo)
    .bind(laudos_common::time::now())
    .bind(id)
    .bind(usuario_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(ModeloLaudo::from_row).transpose()?)
}

/// Delete a template; its phrase links cascade, the phrases stay
pub async fn delete_modelo(pool: &SqlitePool, id: i64, usuario_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM modelos_laudo WHERE id = ? AND usuario_id = ?")
        .bind(id)
        .bind(usuario_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
