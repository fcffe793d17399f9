//! Exam method endpoints (shared list, any authenticated user)

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use laudos_common::db::{begin_write, Metodo};
use serde::Deserialize;

use crate::db::metodos;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, RecordId};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MetodoBody {
    pub metodo: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/metodos", get(list).post(create))
        .route(
            "/api/metodos/:id",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Método não encontrado".to_string())
}

/// GET /api/metodos
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Metodo>>> {
    Ok(Json(metodos::list_metodos(&state.db).await?))
}

/// POST /api/metodos
pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MetodoBody>,
) -> ApiResult<(StatusCode, Json<Metodo>)> {
    let nome = body
        .metodo
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("metodo é obrigatório".to_string()))?;

    let metodo = metodos::create_metodo(&state.db, nome).await?;
    Ok((StatusCode::CREATED, Json(metodo)))
}

/// GET /api/metodos/:id
pub async fn retrieve(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Json<Metodo>> {
    metodos::get_metodo(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/metodos/:id
pub async fn update(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(body): JsonBody<MetodoBody>,
) -> ApiResult<Json<Metodo>> {
    let Some(nome) = body.metodo.as_deref().map(str::trim) else {
        // Nothing to change
        return retrieve(State(state), RecordId(id)).await;
    };
    if nome.is_empty() {
        return Err(ApiError::BadRequest("metodo não pode ser vazio".to_string()));
    }

    metodos::update_metodo(&state.db, id, nome)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// DELETE /api/metodos/:id
///
/// Methods are shared, so one still used by any template is kept (409).
pub async fn destroy(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<StatusCode> {
    let mut tx = begin_write(&state.db, "metodos::destroy").await?;

    if !metodos::metodo_exists(&mut *tx, id).await? {
        return Err(not_found());
    }

    let in_use = metodos::templates_using(&mut *tx, id).await?;
    if in_use > 0 {
        return Err(ApiError::Conflict(format!(
            "Método em uso por {} modelo(s) de laudo",
            in_use
        )));
    }

    metodos::delete_metodo(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
