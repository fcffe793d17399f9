//! User account queries

use laudos_common::db::User;
use laudos_common::Result;
use sqlx::{SqliteExecutor, SqlitePool};

/// Fields for a new account; `password_hash` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub nome_completo: String,
    pub telefone: String,
    pub password_hash: String,
}

/// Insert an account and return it
pub async fn create_user<'e, E>(executor: E, new_user: &NewUser) -> Result<User>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO users (email, nome_completo, telefone, password_hash, is_active, date_joined)
        VALUES (?, ?, ?, ?, 1, ?)
        RETURNING *
        "#,
    )
    .bind(&new_user.email)
    .bind(&new_user.nome_completo)
    .bind(&new_user.telefone)
    .bind(&new_user.password_hash)
    .bind(laudos_common::time::now())
    .fetch_one(executor)
    .await?;

    Ok(User::from_row(&row)?)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(User::from_row).transpose()?)
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(User::from_row).transpose()?)
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Enable or disable login for an account
pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(is_active)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
