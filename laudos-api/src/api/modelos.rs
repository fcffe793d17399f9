//! Report template endpoints, scoped to the requesting user

use axum::{extract::State, http::StatusCode, routing::get, Extension, Json, Router};
use laudos_common::db::ModeloLaudo;
use serde::Deserialize;

use crate::api::CurrentUser;
use crate::db::{metodos, modelos};
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, RecordId};
use crate::AppState;

/// Create/update body; `usuario` and timestamps are never taken from input
#[derive(Debug, Default, Deserialize)]
pub struct ModeloBody {
    pub titulo: Option<String>,
    pub texto: Option<String>,
    pub metodo: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/modelo_laudo", get(list).post(create))
        .route(
            "/api/modelo_laudo/:id",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Modelo de laudo não encontrado".to_string())
}

async fn ensure_metodo(state: &AppState, metodo: i64) -> ApiResult<()> {
    if metodos::metodo_exists(&state.db, metodo).await? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Método {} não existe", metodo)))
    }
}

/// GET /api/modelo_laudo
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ModeloLaudo>>> {
    Ok(Json(modelos::list_modelos(&state.db, user.id()).await?))
}

/// POST /api/modelo_laudo
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(body): JsonBody<ModeloBody>,
) -> ApiResult<(StatusCode, Json<ModeloLaudo>)> {
    let titulo = body
        .titulo
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("titulo é obrigatório".to_string()))?;
    let texto = body
        .texto
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("texto é obrigatório".to_string()))?;
    let metodo = body
        .metodo
        .ok_or_else(|| ApiError::BadRequest("metodo é obrigatório".to_string()))?;

    ensure_metodo(&state, metodo).await?;

    let modelo = modelos::create_modelo(&state.db, user.id(), titulo, texto, metodo).await?;
    Ok((StatusCode::CREATED, Json(modelo)))
}

/// GET /api/modelo_laudo/:id
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<Json<ModeloLaudo>> {
    modelos::get_modelo(&state.db, id, user.id())
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/modelo_laudo/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
    JsonBody(body): JsonBody<ModeloBody>,
) -> ApiResult<Json<ModeloLaudo>> {
    if matches!(body.titulo.as_deref(), Some(t) if t.trim().is_empty()) {
        return Err(ApiError::BadRequest("titulo não pode ser vazio".to_string()));
    }
    if let Some(metodo) = body.metodo {
        ensure_metodo(&state, metodo).await?;
    }

    let changes = modelos::ModeloChanges {
        titulo: body.titulo,
        texto: body.texto,
        metodo: body.metodo,
    };

    modelos::update_modelo(&state.db, id, user.id(), &changes)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// DELETE /api/modelo_laudo/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<StatusCode> {
    if modelos::delete_modelo(&state.db, id, user.id()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
