//! Database initialization on disk

use laudos_common::db::{get_schema_version, get_setting, init_database, set_setting, CURRENT_SCHEMA_VERSION};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("laudos.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("laudos.db");

    let pool1 = init_database(&db_path).await.unwrap();
    set_setting(&pool1, "marker", "kept").await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.as_ref().err());

    let pool2 = pool2.unwrap();
    assert_eq!(get_setting(&pool2, "marker").await.unwrap().as_deref(), Some("kept"));
    assert_eq!(get_schema_version(&pool2).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("laudos.db")).await.unwrap();

    for table in [
        "settings",
        "users",
        "metodos",
        "modelos_laudo",
        "frases",
        "frases_modelos_laudo",
        "variaveis",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "Table {} missing", table);
    }
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("laudos.db")).await.unwrap();

    // No such method or user
    let result = sqlx::query(
        "INSERT INTO modelos_laudo (titulo, texto, metodo_id, usuario_id, criado_em, atualizado_em)
         VALUES ('t', 'x', 999, 999, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Foreign key violation was accepted");
}

#[tokio::test]
async fn test_setting_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("laudos.db")).await.unwrap();

    assert!(get_setting(&pool, "jwt_signing_secret").await.unwrap().is_none());

    set_setting(&pool, "jwt_signing_secret", "one").await.unwrap();
    set_setting(&pool, "jwt_signing_secret", "two").await.unwrap();

    assert_eq!(
        get_setting(&pool, "jwt_signing_secret").await.unwrap().as_deref(),
        Some("two")
    );
}
