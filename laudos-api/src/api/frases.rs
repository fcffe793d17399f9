//! Phrase endpoints: CRUD, category/title lookups and transfer between templates

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use laudos_common::db::{begin_write, Frase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::api::CurrentUser;
use crate::db::{frases, modelos};
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, parse_optional_id, JsonBody, RecordId};
use crate::services::phrase_transfer::{self, TransferError, TransferOutcome, TransferRequest};
use crate::AppState;

/// Create/update body
#[derive(Debug, Default, Deserialize)]
pub struct FraseBody {
    #[serde(rename = "categoriaFrase")]
    pub categoria_frase: Option<String>,
    #[serde(rename = "tituloFrase")]
    pub titulo_frase: Option<String>,
    pub frase: Option<Value>,
    pub modelos_laudo: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FraseQuery {
    pub categoria: Option<String>,
    pub titulo_frase: Option<String>,
    pub modelo_laudo_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriasResponse {
    pub categorias: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TitulosResponse {
    pub titulos_frases: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FrasesResponse {
    pub frases: Vec<Frase>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/frases", get(list).post(create))
        .route("/api/frases/categorias", get(categorias))
        .route("/api/frases/categorias_sem_metodos", get(categorias_sem_metodos))
        .route("/api/frases/titulos_frases", get(titulos_frases))
        .route("/api/frases/frases", get(frases_por_titulo))
        .route("/api/frases/transferir", post(transferir))
        .route(
            "/api/frases/:id",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Frase não encontrada".to_string())
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            TransferError::NotFound(msg) => ApiError::NotFound(msg),
            TransferError::Storage(e) => ApiError::Common(e),
        }
    }
}

/// Every linked template must belong to the user
async fn ensure_owned_modelos(conn: &mut SqliteConnection, ids: &[i64], usuario_id: i64) -> ApiResult<Vec<i64>> {
    let mut distinct = ids.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let owned = modelos::count_owned(&mut *conn, &distinct, usuario_id).await?;
    if owned != distinct.len() {
        return Err(ApiError::BadRequest(
            "modelos_laudo contém modelo inexistente".to_string(),
        ));
    }

    Ok(distinct)
}

// ========================================
// CRUD
// ========================================

/// GET /api/frases[?categoria=&titulo_frase=]
///
/// The exact filter applies only when both parameters are present.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<FraseQuery>,
) -> ApiResult<Json<Vec<Frase>>> {
    let filter = match (
        non_blank(query.categoria.as_deref()),
        non_blank(query.titulo_frase.as_deref()),
    ) {
        (Some(categoria), Some(titulo)) => Some((categoria, titulo)),
        _ => None,
    };

    Ok(Json(frases::list_frases(&state.db, user.id(), filter).await?))
}

/// POST /api/frases
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(body): JsonBody<FraseBody>,
) -> ApiResult<(StatusCode, Json<Frase>)> {
    let categoria = body
        .categoria_frase
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("categoriaFrase é obrigatório".to_string()))?;
    let titulo = body
        .titulo_frase
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("tituloFrase é obrigatório".to_string()))?;
    let payload = body
        .frase
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("frase é obrigatório".to_string()))?;

    let mut tx = begin_write(&state.db, "frases::create").await?;

    let links = ensure_owned_modelos(&mut tx, body.modelos_laudo.as_deref().unwrap_or_default(), user.id()).await?;
    let id = frases::insert_frase(&mut tx, user.id(), categoria, titulo, payload).await?;
    frases::set_links(&mut tx, id, &links).await?;
    let frase = frases::get_frase(&mut tx, id, user.id()).await?.ok_or_else(not_found)?;

    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(frase)))
}

/// GET /api/frases/:id
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<Json<Frase>> {
    let mut conn = state.db.acquire().await?;
    frases::get_frase(&mut conn, id, user.id())
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT|PATCH /api/frases/:id
///
/// A supplied `modelos_laudo` replaces the whole link set.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
    JsonBody(body): JsonBody<FraseBody>,
) -> ApiResult<Json<Frase>> {
    for (field, value) in [
        ("categoriaFrase", &body.categoria_frase),
        ("tituloFrase", &body.titulo_frase),
    ] {
        if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err(ApiError::BadRequest(format!("{} não pode ser vazio", field)));
        }
    }

    let mut tx = begin_write(&state.db, "frases::update").await?;

    let changes = frases::FraseChanges {
        categoria_frase: body.categoria_frase,
        titulo_frase: body.titulo_frase,
        frase: body.frase,
    };
    if !frases::update_frase(&mut tx, id, user.id(), &changes).await? {
        return Err(not_found());
    }

    if let Some(ids) = body.modelos_laudo.as_deref() {
        let links = ensure_owned_modelos(&mut tx, ids, user.id()).await?;
        frases::set_links(&mut tx, id, &links).await?;
    }

    let frase = frases::get_frase(&mut tx, id, user.id()).await?.ok_or_else(not_found)?;
    tx.commit().await?;
    Ok(Json(frase))
}

/// DELETE /api/frases/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> ApiResult<StatusCode> {
    if frases::delete_frase(&state.db, id, user.id()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

// ========================================
// Lookups
// ========================================

/// GET /api/frases/categorias[?modelo_laudo_id=]
pub async fn categorias(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<FraseQuery>,
) -> ApiResult<Json<CategoriasResponse>> {
    let modelo_id = parse_optional_id("modelo_laudo_id", query.modelo_laudo_id.as_deref())?;
    let categorias = frases::categorias(&state.db, user.id(), modelo_id).await?;
    Ok(Json(CategoriasResponse { categorias }))
}

/// GET /api/frases/categorias_sem_metodos
pub async fn categorias_sem_metodos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<CategoriasResponse>> {
    let categorias = frases::categorias_sem_modelo(&state.db, user.id()).await?;
    Ok(Json(CategoriasResponse { categorias }))
}

/// GET /api/frases/titulos_frases?categoria=[&modelo_laudo_id=]
pub async fn titulos_frases(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<FraseQuery>,
) -> ApiResult<Json<TitulosResponse>> {
    let categoria = non_blank(query.categoria.as_deref())
        .ok_or_else(|| ApiError::BadRequest("categoria é obrigatória".to_string()))?;
    let modelo_id = parse_optional_id("modelo_laudo_id", query.modelo_laudo_id.as_deref())?;

    let titulos_frases = frases::titulos(&state.db, user.id(), categoria, modelo_id).await?;
    Ok(Json(TitulosResponse { titulos_frases }))
}

/// GET /api/frases/frases?categoria=&titulo_frase=
pub async fn frases_por_titulo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<FraseQuery>,
) -> ApiResult<Json<FrasesResponse>> {
    let (Some(categoria), Some(titulo)) = (
        non_blank(query.categoria.as_deref()),
        non_blank(query.titulo_frase.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "titulo_frase e categoria são obrigatórios".to_string(),
        ));
    };

    let frases = frases::list_frases(&state.db, user.id(), Some((categoria, titulo))).await?;
    Ok(Json(FrasesResponse { frases }))
}

// ========================================
// Transfer
// ========================================

/// POST /api/frases/transferir
pub async fn transferir(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(request): JsonBody<TransferRequest>,
) -> ApiResult<Json<TransferOutcome>> {
    let outcome = phrase_transfer::transfer_phrases(&state.db, user.id(), &request).await?;
    Ok(Json(outcome))
}
