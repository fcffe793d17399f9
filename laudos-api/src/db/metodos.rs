//! Exam method queries (shared by all users)

use laudos_common::db::Metodo;
use laudos_common::Result;
use sqlx::{SqliteExecutor, SqlitePool};

pub async fn list_metodos(pool: &SqlitePool) -> Result<Vec<Metodo>> {
    let rows = sqlx::query("SELECT id, metodo FROM metodos ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(Metodo::from_row).collect::<sqlx::Result<_>>()?)
}

pub async fn get_metodo(pool: &SqlitePool, id: i64) -> Result<Option<Metodo>> {
    let row = sqlx::query("SELECT id, metodo FROM metodos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(Metodo::from_row).transpose()?)
}

pub async fn metodo_exists<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM metodos WHERE id = ?)")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(exists)
}

pub async fn create_metodo(pool: &SqlitePool, metodo: &str) -> Result<Metodo> {
    let row = sqlx::query("INSERT INTO metodos (metodo) VALUES (?) RETURNING id, metodo")
        .bind(metodo)
        .fetch_one(pool)
        .await?;

    Ok(Metodo::from_row(&row)?)
}

pub async fn update_metodo(pool: &SqlitePool, id: i64, metodo: &str) -> Result<Option<Metodo>> {
    let row = sqlx::query("UPDATE metodos SET metodo = ? WHERE id = ? RETURNING id, metodo")
        .bind(metodo)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(Metodo::from_row).transpose()?)
}

/// Number of templates (any owner) that use a method
pub async fn templates_using<'e, E>(executor: E, id: i64) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modelos_laudo WHERE metodo_id = ?")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Delete a method; callers check `templates_using` first since templates cascade
pub async fn delete_metodo<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM metodos WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
