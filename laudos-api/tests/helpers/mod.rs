//! Shared helpers for laudos-api integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use laudos_api::db::users::{self, NewUser};
use laudos_api::{build_router, AppState};
use laudos_common::api::{hash_password, TokenService, TokenType};
use laudos_common::db::{init_database, init_memory_database};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use tower::util::ServiceExt; // for `oneshot`

pub const TEST_PASSWORD: &str = "senha-segura-123";

#[derive(Clone)]
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub tokens: TokenService,
}

pub fn test_tokens() -> TokenService {
    TokenService::new(
        "integration-test-secret",
        chrono::Duration::minutes(60),
        chrono::Duration::days(7),
    )
}

/// App over a fresh in-memory database, no AI provider
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|state| state).await
}

/// App with extra state wiring
pub async fn create_test_app_with(configure: impl FnOnce(AppState) -> AppState) -> TestApp {
    let pool = init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let tokens = test_tokens();

    let state = configure(AppState::new(pool.clone(), tokens.clone()));
    TestApp {
        app: build_router(state),
        pool,
        tokens,
    }
}

/// App over an on-disk WAL database with the production pool settings
pub async fn create_disk_app(
    data_folder: &Path,
    configure: impl FnOnce(AppState) -> AppState,
) -> TestApp {
    let pool = init_database(&data_folder.join("laudos.db"))
        .await
        .expect("Failed to create on-disk database");
    let tokens = test_tokens();

    let state = configure(AppState::new(pool.clone(), tokens.clone()));
    TestApp {
        app: build_router(state),
        pool,
        tokens,
    }
}

impl TestApp {
    /// Insert an account directly and return (id, access token)
    pub async fn user(&self, email: &str) -> (i64, String) {
        let user = users::create_user(
            &self.pool,
            &NewUser {
                email: email.to_string(),
                nome_completo: format!("Dr(a). {}", email),
                telefone: String::new(),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
            },
        )
        .await
        .unwrap();

        let token = self.tokens.issue(user.id, &user.email, TokenType::Access).unwrap();
        (user.id, token)
    }

    /// Send a request and return status plus parsed JSON body (Null when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a method through the API and return its id
    pub async fn metodo(&self, token: &str, nome: &str) -> i64 {
        let (status, body) = self
            .post("/api/metodos", token, serde_json::json!({"metodo": nome}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    /// Create a template through the API and return its id
    pub async fn modelo(&self, token: &str, metodo: i64, titulo: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/modelo_laudo",
                token,
                serde_json::json!({"titulo": titulo, "texto": "Texto do modelo", "metodo": metodo}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    /// Create a phrase through the API and return its id
    pub async fn frase(&self, token: &str, categoria: &str, titulo: &str, modelos: &[i64]) -> i64 {
        let (status, body) = self
            .post(
                "/api/frases",
                token,
                serde_json::json!({
                    "categoriaFrase": categoria,
                    "tituloFrase": titulo,
                    "frase": {"texto": format!("{} - {}", categoria, titulo)},
                    "modelos_laudo": modelos,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    /// Total rows in the phrase/template link table
    pub async fn link_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM frases_modelos_laudo")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Template ids linked to a phrase
    pub async fn links_of(&self, frase_id: i64) -> Vec<i64> {
        sqlx::query_scalar(
            "SELECT modelo_laudo_id FROM frases_modelos_laudo WHERE frase_id = ? ORDER BY modelo_laudo_id",
        )
        .bind(frase_id)
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }
}
