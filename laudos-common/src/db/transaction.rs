//! Write transactions
//!
//! A deferred SQLite transaction that reads before it writes cannot be
//! upgraded to a writer once another connection has committed
//! (`SQLITE_BUSY_SNAPSHOT`), and the busy timeout does not help. Every
//! read-then-write unit of work therefore starts with `BEGIN IMMEDIATE`, which
//! takes the write lock up front and waits on the busy timeout instead.

use std::time::Instant;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::Result;

/// Wait above which lock acquisition is logged as contention
const SLOW_LOCK_MS: u64 = 1000;

/// Begin a transaction holding the database write lock
///
/// Concurrent callers queue on the lock, so each one reads the state the
/// previous one committed.
pub async fn begin_write(pool: &SqlitePool, caller: &'static str) -> Result<Transaction<'static, Sqlite>> {
    let start = Instant::now();
    let tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let wait_ms = start.elapsed().as_millis() as u64;
    if wait_ms > SLOW_LOCK_MS {
        warn!(caller, wait_ms, "Slow write lock acquisition");
    } else {
        debug!(caller, wait_ms, "Write lock acquired");
    }

    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_database;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_read_then_write_transactions_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("laudos.db")).await.unwrap();
        crate::db::init::set_setting(&pool, "counter", "0").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = begin_write(&pool, "test").await?;
                let value: String =
                    sqlx::query_scalar("SELECT value FROM settings WHERE key = 'counter'")
                        .fetch_one(&mut *tx)
                        .await?;
                let next = value.parse::<i64>().unwrap() + 1;
                tokio::task::yield_now().await;
                sqlx::query("UPDATE settings SET value = ? WHERE key = 'counter'")
                    .bind(next.to_string())
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<(), crate::Error>(())
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let value = crate::db::init::get_setting(&pool, "counter").await.unwrap();
        assert_eq!(value.as_deref(), Some("8"));
    }
}
