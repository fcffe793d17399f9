//! Template variable endpoints, scoped to the requesting user

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use laudos_common::db::Variavel;
use serde::Deserialize;
use serde_json::Value;

use crate::api::CurrentUser;
use crate::db::variaveis;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, RecordId};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VariavelBody {
    #[serde(rename = "tituloVariavel")]
    pub titulo_variavel: Option<String>,
    pub variavel: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VariavelQuery {
    #[serde(rename = "tituloVariavel")]
    pub titulo_variavel: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/variaveis", get(list).post(create))
        .route(
            "/api/variaveis/:id",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Variável não encontrada".to_string())
}

/// GET /api/variaveis[?tituloVariavel=]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<VariavelQuery>,
) -> ApiResult<Json<Vec<Variavel>>> {
    let titulo = query.titulo_variavel.as_deref();
    Ok(Json(variaveis::list_variaveis(&state.db, user.id(), titulo).await?))
}

/// POST /api/variaveis
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(body): JsonBody<VariavelBody>,
) -> ApiResult<(StatusCode, Json<Variavel>)> {
    let titulo = body
        .titulo_variavel
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("tituloVariavel é obrigatório".to_string()))?;
    let payload = body
        .variavel
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("variavel é obrigatório".to_string()))?;

    let variavel = variaveis::create_variavel(&state.db, user.id(), titulo, payload).await?;
    Ok((StatusCode::CREATED, Json(variavel)))
}

/// GET /api/variaveis/:id
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<Json<Variavel>> {
    variaveis::get_variavel(&state.db, id, user.id())
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/variaveis/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
    JsonBody(body): JsonBody<VariavelBody>,
) -> ApiResult<Json<Variavel>> {
    if matches!(body.titulo_variavel.as_deref(), Some(t) if t.trim().is_empty()) {
        return Err(ApiError::BadRequest("tituloVariavel não pode ser vazio".to_string()));
    }

    let changes = variaveis::VariavelChanges {
        titulo_variavel: body.titulo_variavel,
        variavel: body.variavel,
    };

    variaveis::update_variavel(&state.db, id, user.id(), &changes)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// DELETE /api/variaveis/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<StatusCode> {
    if variaveis::delete_variavel(&state.db, id, user.id()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
