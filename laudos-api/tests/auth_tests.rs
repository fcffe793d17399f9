//! Authentication endpoint and middleware tests

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{create_test_app, create_test_app_with, TEST_PASSWORD};
use laudos_api::db::users;
use laudos_common::api::TokenType;
use serde_json::json;

fn registration(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": "correct-horse-42",
        "nome_completo": "Dra. Beatriz Lima",
        "telefone": "11 99999-0000"
    })
}

#[tokio::test]
async fn test_register_returns_tokens_and_user() {
    let t = create_test_app().await;

    let (status, body) = t
        .send(Method::POST, "/api/auth/register", None, Some(registration("Bia@Example.com")))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["access"].as_str().is_some());
    assert!(body["refresh"].as_str().is_some());
    assert_eq!(body["user"]["email"], "bia@example.com");
    assert_eq!(body["user"]["nome_completo"], "Dra. Beatriz Lima");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let t = create_test_app().await;

    let (first, _) = t
        .send(Method::POST, "/api/auth/register", None, Some(registration("dup@example.com")))
        .await;
    assert_eq!(first, StatusCode::CREATED);

    // Case differences do not make a new account
    let (status, body) = t
        .send(Method::POST, "/api/auth/register", None, Some(registration("DUP@example.com")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Já existe um usuário com este email.");
}

#[tokio::test]
async fn test_register_validates_fields() {
    let t = create_test_app().await;

    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "a@example.com", "password": "short", "nome_completo": "A", "telefone": "1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("8"));

    let (status, _) = t
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "not-an-email", "password": "long-enough-1", "nome_completo": "A", "telefone": "1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "b@example.com", "password": "long-enough-1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "nome_completo é obrigatório");

    for telefone in [None, Some("   ")] {
        let mut body = json!({
            "email": "c@example.com",
            "password": "long-enough-1",
            "nome_completo": "Dr. C"
        });
        if let Some(telefone) = telefone {
            body["telefone"] = json!(telefone);
        }
        let (status, body) = t
            .send(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "telefone é obrigatório");
    }

    let (status, _) = t
        .send(Method::POST, "/api/auth/login", None, Some(json!({"email": "c@example.com", "password": "long-enough-1"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_messages() {
    let t = create_test_app().await;
    let (id, _) = t.user("ana@example.com").await;

    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ninguem@example.com", "password": TEST_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Usuário não encontrado.");

    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Senha incorreta.");

    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": " ANA@example.com ", "password": TEST_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["id"], id);

    users::set_active(&t.pool, id, false).await.unwrap();
    let (status, body) = t
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": TEST_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Usuário inativo.");
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let t = create_test_app().await;
    let (status, body) = t
        .send(Method::POST, "/api/auth/register", None, Some(registration("r@example.com")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let refresh = body["refresh"].as_str().unwrap().to_string();

    let (status, body) = t
        .send(Method::POST, "/api/auth/refresh", None, Some(json!({"refresh": refresh})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let access = body["access"].as_str().unwrap();

    let (status, me) = t.get("/api/auth/me", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "r@example.com");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let t = create_test_app().await;
    let (_, access) = t.user("x@example.com").await;

    let (status, _) = t
        .send(Method::POST, "/api/auth/refresh", None, Some(json!({"refresh": access})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = create_test_app().await;

    let (status, body) = t.send(Method::GET, "/api/modelo_laudo", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = t.get("/api/modelo_laudo", "garbage.token.value").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let t = create_test_app().await;
    let (id, _) = t.user("y@example.com").await;
    let refresh = t.tokens.issue(id, "y@example.com", TokenType::Refresh).unwrap();

    let (status, _) = t.get("/api/metodos", &refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_access_token_rejected() {
    let t = create_test_app().await;
    let (id, _) = t.user("z@example.com").await;
    let expired = t
        .tokens
        .issue_with_ttl(id, "z@example.com", TokenType::Access, chrono::Duration::minutes(-5))
        .unwrap();

    let (status, _) = t.get("/api/metodos", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_user_token_rejected() {
    let t = create_test_app().await;
    let (id, token) = t.user("off@example.com").await;

    let (status, _) = t.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);

    users::set_active(&t.pool, id, false).await.unwrap();
    let (status, _) = t.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_copies_seed_content() {
    let t = create_test_app_with(|s| s.with_seed_user(Some("seed@example.com".to_string()))).await;
    let (_, seed_token) = t.user("seed@example.com").await;

    let metodo = t.metodo(&seed_token, "Ultrassonografia").await;
    let modelo = t.modelo(&seed_token, metodo, "Abdome total").await;
    t.frase(&seed_token, "Fígado", "Normal", &[modelo]).await;
    let (status, _) = t
        .post(
            "/api/variaveis",
            &seed_token,
            json!({"tituloVariavel": "Lateralidade", "variavel": {"opcoes": ["direito", "esquerdo"]}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t
        .send(Method::POST, "/api/auth/register", None, Some(registration("novo@example.com")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let access = body["access"].as_str().unwrap().to_string();
    let new_id = body["user"]["id"].as_i64().unwrap();

    let (_, modelos) = t.get("/api/modelo_laudo", &access).await;
    let modelos = modelos.as_array().unwrap();
    assert_eq!(modelos.len(), 1);
    assert_eq!(modelos[0]["titulo"], "Abdome total");
    assert_eq!(modelos[0]["usuario"], new_id);
    let copied_modelo = modelos[0]["id"].as_i64().unwrap();
    assert_ne!(copied_modelo, modelo);

    let (_, frases) = t.get("/api/frases", &access).await;
    let frases = frases.as_array().unwrap();
    assert_eq!(frases.len(), 1);
    assert_eq!(frases[0]["modelos_laudo"], json!([copied_modelo]));

    let (_, variaveis) = t.get("/api/variaveis", &access).await;
    assert_eq!(variaveis.as_array().unwrap().len(), 1);

    // Seed account is untouched
    let (_, seed_frases) = t.get("/api/frases", &seed_token).await;
    assert_eq!(seed_frases.as_array().unwrap().len(), 1);
}
