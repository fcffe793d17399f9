//! Starter content for new accounts
//!
//! A freshly registered user receives copies of the seed account's templates,
//! the phrases linked to those templates (links re-pointed to the copies) and
//! its variables. Everything is copied in one transaction.

use std::collections::HashMap;

use laudos_common::db::{begin_write, Frase, ModeloLaudo, Variavel};
use laudos_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::{frases, modelos, users, variaveis};

/// Number of records copied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub modelos: usize,
    pub frases: usize,
    pub variaveis: usize,
}

/// Copy the seed account's content into `new_user_id`
///
/// Returns an empty report when the seed account does not exist.
pub async fn seed_new_user(pool: &SqlitePool, seed_email: &str, new_user_id: i64) -> Result<SeedReport> {
    let Some(seed) = users::get_user_by_email(pool, seed_email).await? else {
        debug!(seed_email, "Seed account not found, nothing to copy");
        return Ok(SeedReport::default());
    };

    if seed.id == new_user_id {
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    let mut tx = begin_write(pool, "seed_new_user").await?;

    let seed_modelos = sqlx::query(
        "SELECT id, titulo, texto, metodo_id, usuario_id, criado_em, atualizado_em
         FROM modelos_laudo WHERE usuario_id = ? ORDER BY id",
    )
    .bind(seed.id)
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(ModeloLaudo::from_row)
    .collect::<sqlx::Result<Vec<_>>>()?;

    let mut modelo_map: HashMap<i64, i64> = HashMap::new();
    for modelo in &seed_modelos {
        let copy =
            modelos::create_modelo(&mut *tx, new_user_id, &modelo.titulo, &modelo.texto, modelo.metodo)
                .await?;
        modelo_map.insert(modelo.id, copy.id);
        report.modelos += 1;
    }

    let seed_frases = sqlx::query(
        r#"
        SELECT f.id, f.categoria_frase, f.titulo_frase, f.frase, f.usuario_id, f.criado_em, f.atualizado_em
        FROM frases f
        WHERE f.usuario_id = ?
          AND EXISTS (
              SELECT 1 FROM frases_modelos_laudo l
              JOIN modelos_laudo m ON m.id = l.modelo_laudo_id
              WHERE l.frase_id = f.id AND m.usuario_id = ?
          )
        ORDER BY f.id
        "#,
    )
    .bind(seed.id)
    .bind(seed.id)
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(Frase::from_row)
    .collect::<Result<Vec<_>>>()?;

    for frase in &seed_frases {
        let copy_id = frases::insert_frase(
            &mut tx,
            new_user_id,
            &frase.categoria_frase,
            &frase.titulo_frase,
            &frase.frase,
        )
        .await?;

        for modelo_id in frases::modelo_ids_for(&mut tx, frase.id).await? {
            if let Some(&copied_modelo) = modelo_map.get(&modelo_id) {
                frases::add_link(&mut tx, copy_id, copied_modelo).await?;
            }
        }
        report.frases += 1;
    }

    let seed_variaveis = sqlx::query(
        "SELECT id, titulo_variavel, variavel, usuario_id, criado_em, atualizado_em
         FROM variaveis WHERE usuario_id = ? ORDER BY id",
    )
    .bind(seed.id)
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(Variavel::from_row)
    .collect::<Result<Vec<_>>>()?;

    for variavel in &seed_variaveis {
        variaveis::create_variavel(&mut *tx, new_user_id, &variavel.titulo_variavel, &variavel.variavel)
            .await?;
        report.variaveis += 1;
    }

    tx.commit().await?;

    info!(
        new_user_id,
        modelos = report.modelos,
        frases = report.frases,
        variaveis = report.variaveis,
        "Seeded new account"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::metodos;
    use laudos_common::db::init_memory_database;
    use serde_json::json;

    async fn user(pool: &SqlitePool, email: &str) -> i64 {
        users::create_user(
            pool,
            &users::NewUser {
                email: email.into(),
                nome_completo: email.into(),
                telefone: String::new(),
                password_hash: "x".into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_seed_copies_templates_phrases_and_variables() {
        let pool = init_memory_database().await.unwrap();
        let seed = user(&pool, "modelo@example.com").await;
        let metodo = metodos::create_metodo(&pool, "Tomografia").await.unwrap();
        let modelo = modelos::create_modelo(&pool, seed, "Crânio", "texto", metodo.id)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let linked = frases::insert_frase(&mut conn, seed, "Encéfalo", "Normal", &json!("ok"))
            .await
            .unwrap();
        frases::add_link(&mut conn, linked, modelo.id).await.unwrap();
        // Unlinked phrases are not part of the starter content
        frases::insert_frase(&mut conn, seed, "Solta", "Rascunho", &json!("x"))
            .await
            .unwrap();
        drop(conn);

        variaveis::create_variavel(&pool, seed, "lado", &json!(["direito", "esquerdo"]))
            .await
            .unwrap();

        let novo = user(&pool, "novo@example.com").await;
        let report = seed_new_user(&pool, "modelo@example.com", novo).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                modelos: 1,
                frases: 1,
                variaveis: 1
            }
        );

        let copied_modelos = modelos::list_modelos(&pool, novo).await.unwrap();
        assert_eq!(copied_modelos.len(), 1);
        assert_ne!(copied_modelos[0].id, modelo.id);
        assert_eq!(copied_modelos[0].metodo, metodo.id);

        let copied_frases = frases::list_frases(&pool, novo, None).await.unwrap();
        assert_eq!(copied_frases.len(), 1);
        assert_eq!(copied_frases[0].modelos_laudo, vec![copied_modelos[0].id]);

        // Seed content is untouched
        assert_eq!(frases::list_frases(&pool, seed, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_seed_account_is_noop() {
        let pool = init_memory_database().await.unwrap();
        let novo = user(&pool, "novo@example.com").await;

        let report = seed_new_user(&pool, "ninguem@example.com", novo).await.unwrap();
        assert_eq!(report, SeedReport::default());
    }
}
