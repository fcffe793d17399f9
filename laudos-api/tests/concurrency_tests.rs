//! Concurrent writers against an on-disk WAL database
//!
//! The in-memory app used elsewhere has a single connection, so requests never
//! overlap there. These tests use the production pool on a temp folder.

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{create_disk_app, TestApp};
use serde_json::{json, Value};

const WRITERS: usize = 8;

async fn concurrent_posts(t: &TestApp, requests: Vec<(String, Value)>) -> Vec<(StatusCode, Value)> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|(token, body)| {
            let t = t.clone();
            tokio::spawn(async move { t.post("/api/frases/transferir", &token, body).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_moves_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    let t = create_disk_app(dir.path(), |s| s).await;
    let (_, token) = t.user("mover@example.com").await;
    let metodo = t.metodo(&token, "Ultrassonografia").await;
    let origem = t.modelo(&token, metodo, "Origem").await;
    let destino = t.modelo(&token, metodo, "Destino").await;

    for round in 0..5 {
        let frase = t.frase(&token, "Rins", &format!("Rodada {}", round), &[origem]).await;
        let body = json!({
            "modelo_origem_id": origem,
            "modelo_destino_id": destino,
            "frases_ids": [frase],
            "modo_operacao": "mover",
        });

        let results = concurrent_posts(&t, vec![(token.clone(), body); WRITERS]).await;

        let ok = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
        let rejected = results
            .iter()
            .filter(|(s, _)| *s == StatusCode::BAD_REQUEST)
            .count();
        assert_eq!(ok, 1, "round {}: {:?}", round, results);
        assert_eq!(rejected, WRITERS - 1, "round {}: {:?}", round, results);
        assert_eq!(t.links_of(frase).await, vec![destino]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_copies_by_different_users() {
    let dir = tempfile::tempdir().unwrap();
    let t = create_disk_app(dir.path(), |s| s).await;
    let (_, admin) = t.user("admin@example.com").await;
    let metodo = t.metodo(&admin, "Tomografia").await;

    let mut requests = Vec::new();
    let mut phrases = Vec::new();
    for i in 0..WRITERS {
        let (_, token) = t.user(&format!("medico{}@example.com", i)).await;
        let origem = t.modelo(&token, metodo, "Tórax").await;
        let destino = t.modelo(&token, metodo, "Abdome").await;
        let frase = t.frase(&token, "Pulmões", "Normal", &[origem]).await;
        phrases.push((frase, origem, destino));
        requests.push((
            token,
            json!({
                "modelo_origem_id": origem,
                "modelo_destino_id": destino,
                "frases_ids": [frase],
                "modo_operacao": "copiar",
            }),
        ));
    }

    let results = concurrent_posts(&t, requests).await;
    assert!(
        results.iter().all(|(s, _)| *s == StatusCode::OK),
        "{:?}",
        results
    );

    for (frase, origem, destino) in phrases {
        let mut expected = vec![origem, destino];
        expected.sort();
        assert_eq!(t.links_of(frase).await, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_all_receive_seed_content() {
    let dir = tempfile::tempdir().unwrap();
    let t = create_disk_app(dir.path(), |s| {
        s.with_seed_user(Some("seed@example.com".to_string()))
    })
    .await;
    let (_, seed) = t.user("seed@example.com").await;
    let metodo = t.metodo(&seed, "Ultrassonografia").await;
    let modelo = t.modelo(&seed, metodo, "Abdome total").await;
    t.frase(&seed, "Fígado", "Normal", &[modelo]).await;

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let t = t.clone();
            tokio::spawn(async move {
                t.send(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    Some(json!({
                        "email": format!("novo{}@example.com", i),
                        "password": "correct-horse-42",
                        "nome_completo": format!("Dr(a). {}", i),
                        "telefone": "11 90000-0000",
                    })),
                )
                .await
            })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let access = body["access"].as_str().unwrap();

        let (_, modelos) = t.get("/api/modelo_laudo", access).await;
        assert_eq!(modelos.as_array().unwrap().len(), 1, "{}", body["user"]);
        let (_, frases) = t.get("/api/frases", access).await;
        assert_eq!(frases.as_array().unwrap().len(), 1, "{}", body["user"]);
    }
}
