//! Phrase queries, phrase/template links and the category lookups
//!
//! Distinct lookups return values in first-insertion order
//! (`GROUP BY value ORDER BY MIN(id)`).

use std::collections::{HashMap, HashSet};

use laudos_common::db::Frase;
use laudos_common::Result;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};

const COLUMNS: &str =
    "f.id, f.categoria_frase, f.titulo_frase, f.frase, f.usuario_id, f.criado_em, f.atualizado_em";

/// Fields accepted on update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct FraseChanges {
    pub categoria_frase: Option<String>,
    pub titulo_frase: Option<String>,
    pub frase: Option<Value>,
}

// ========================================
// Records
// ========================================

/// All of a user's phrases, optionally restricted to an exact (category, title)
pub async fn list_frases(
    pool: &SqlitePool,
    usuario_id: i64,
    categoria_titulo: Option<(&str, &str)>,
) -> Result<Vec<Frase>> {
    let mut conn = pool.acquire().await?;

    let rows = match categoria_titulo {
        Some((categoria, titulo)) => {
            sqlx::query(&format!(
                "SELECT {} FROM frases f
                 WHERE f.usuario_id = ? AND f.categoria_frase = ? AND f.titulo_frase = ?
                 ORDER BY f.id",
                COLUMNS
            ))
            .bind(usuario_id)
            .bind(categoria)
            .bind(titulo)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM frases f WHERE f.usuario_id = ? ORDER BY f.id",
                COLUMNS
            ))
            .bind(usuario_id)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    let mut frases = rows.iter().map(Frase::from_row).collect::<Result<Vec<_>>>()?;
    let mut links = links_for_user(&mut conn, usuario_id).await?;

    for frase in &mut frases {
        frase.modelos_laudo = links.remove(&frase.id).unwrap_or_default();
    }

    Ok(frases)
}

/// Phrase by id with its links, only if owned by `usuario_id`
pub async fn get_frase(conn: &mut SqliteConnection, id: i64, usuario_id: i64) -> Result<Option<Frase>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM frases f WHERE f.id = ? AND f.usuario_id = ?",
        COLUMNS
    ))
    .bind(id)
    .bind(usuario_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut frase = Frase::from_row(&row)?;
    frase.modelos_laudo = modelo_ids_for(conn, id).await?;
    Ok(Some(frase))
}

pub async fn insert_frase(
    conn: &mut SqliteConnection,
    usuario_id: i64,
    categoria_frase: &str,
    titulo_frase: &str,
    frase: &Value,
) -> Result<i64> {
    let now = laudos_common::time::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO frases (categoria_frase, titulo_frase, frase, usuario_id, criado_em, atualizado_em)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(categoria_frase)
    .bind(titulo_frase)
    .bind(serde_json::to_string(frase)?)
    .bind(usuario_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Apply changes; returns false when the phrase is missing or not owned
pub async fn update_frase(
    conn: &mut SqliteConnection,
    id: i64,
    usuario_id: i64,
    changes: &FraseChanges,
) -> Result<bool> {
    let payload = changes.frase.as_ref().map(serde_json::to_string).transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE frases SET
            categoria_frase = COALESCE(?, categoria_frase),
            titulo_frase = COALESCE(?, titulo_frase),
            frase = COALESCE(?, frase),
            atualizado_em = ?
        WHERE id = ? AND usuario_id = ?
        "#,
    )
    .bind(changes.categoria_frase.as_deref())
    .bind(changes.titulo_frase.as_deref())
    .bind(payload)
    .bind(laudos_common::time::now())
    .bind(id)
    .bind(usuario_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_frase(pool: &SqlitePool, id: i64, usuario_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM frases WHERE id = ? AND usuario_id = ?")
        .bind(id)
        .bind(usuario_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ========================================
// Links
// ========================================

/// Template ids linked to a phrase, ascending
pub async fn modelo_ids_for(conn: &mut SqliteConnection, frase_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT modelo_laudo_id FROM frases_modelos_laudo WHERE frase_id = ? ORDER BY modelo_laudo_id",
    )
    .bind(frase_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// Ids of a user's phrases linked to a template
pub async fn frase_ids_linked_to(
    conn: &mut SqliteConnection,
    modelo_id: i64,
    usuario_id: i64,
) -> Result<HashSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT l.frase_id
        FROM frases_modelos_laudo l
        JOIN frases f ON f.id = l.frase_id
        WHERE l.modelo_laudo_id = ? AND f.usuario_id = ?
        "#,
    )
    .bind(modelo_id)
    .bind(usuario_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Add a link; false if it already existed
pub async fn add_link(conn: &mut SqliteConnection, frase_id: i64, modelo_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO frases_modelos_laudo (frase_id, modelo_laudo_id) VALUES (?, ?)",
    )
    .bind(frase_id)
    .bind(modelo_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a link; false if there was none
pub async fn remove_link(conn: &mut SqliteConnection, frase_id: i64, modelo_id: i64) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM frases_modelos_laudo WHERE frase_id = ? AND modelo_laudo_id = ?")
            .bind(frase_id)
            .bind(modelo_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the full link set of a phrase
pub async fn set_links(conn: &mut SqliteConnection, frase_id: i64, modelo_ids: &[i64]) -> Result<()> {
    sqlx::query("DELETE FROM frases_modelos_laudo WHERE frase_id = ?")
        .bind(frase_id)
        .execute(&mut *conn)
        .await?;

    for modelo_id in modelo_ids {
        add_link(conn, frase_id, *modelo_id).await?;
    }

    Ok(())
}

async fn links_for_user(conn: &mut SqliteConnection, usuario_id: i64) -> Result<HashMap<i64, Vec<i64>>> {
    let rows = sqlx::query(
        r#"
        SELECT l.frase_id, l.modelo_laudo_id
        FROM frases_modelos_laudo l
        JOIN frases f ON f.id = l.frase_id
        WHERE f.usuario_id = ?
        ORDER BY l.modelo_laudo_id
        "#,
    )
    .bind(usuario_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        let frase_id: i64 = row.try_get("frase_id")?;
        let modelo_id: i64 = row.try_get("modelo_laudo_id")?;
        links.entry(frase_id).or_default().push(modelo_id);
    }

    Ok(links)
}

// ========================================
// Lookups
// ========================================

/// Distinct categories of a user's phrases, or of those linked to one template
pub async fn categorias(pool: &SqlitePool, usuario_id: i64, modelo_id: Option<i64>) -> Result<Vec<String>> {
    let values: Vec<String> = match modelo_id {
        Some(modelo_id) => {
            sqlx::query_scalar(
                r#"
                SELECT f.categoria_frase
                FROM frases f
                JOIN frases_modelos_laudo l ON l.frase_id = f.id
                WHERE f.usuario_id = ? AND l.modelo_laudo_id = ?
                GROUP BY f.categoria_frase
                ORDER BY MIN(f.id)
                "#,
            )
            .bind(usuario_id)
            .bind(modelo_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                SELECT categoria_frase FROM frases
                WHERE usuario_id = ?
                GROUP BY categoria_frase
                ORDER BY MIN(id)
                "#,
            )
            .bind(usuario_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(values)
}

/// Distinct categories of a user's phrases with no template link
pub async fn categorias_sem_modelo(pool: &SqlitePool, usuario_id: i64) -> Result<Vec<String>> {
    let values: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT f.categoria_frase
        FROM frases f
        WHERE f.usuario_id = ?
          AND NOT EXISTS (SELECT 1 FROM frases_modelos_laudo l WHERE l.frase_id = f.id)
        GROUP BY f.categoria_frase
        ORDER BY MIN(f.id)
        "#,
    )
    .bind(usuario_id)
    .fetch_all(pool)
    .await?;

    Ok(values)
}

/// Distinct titles within a category, optionally restricted to one template
pub async fn titulos(
    pool: &SqlitePool,
    usuario_id: i64,
    categoria: &str,
    modelo_id: Option<i64>,
) -> Result<Vec<String>> {
    let values: Vec<String> = match modelo_id {
        Some(modelo_id) => {
            sqlx::query_scalar(
                r#"
                SELECT f.titulo_frase
                FROM frases f
                JOIN frases_modelos_laudo l ON l.frase_id = f.id
                WHERE f.usuario_id = ? AND f.categoria_frase = ? AND l.modelo_laudo_id = ?
                GROUP BY f.titulo_frase
                ORDER BY MIN(f.id)
                "#,
            )
            .bind(usuario_id)
            .bind(categoria)
            .bind(modelo_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                SELECT titulo_frase FROM frases
                WHERE usuario_id = ? AND categoria_frase = ?
                GROUP BY titulo_frase
                ORDER BY MIN(id)
                "#,
            )
            .bind(usuario_id)
            .bind(categoria)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(values)
}
