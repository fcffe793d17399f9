//! Report generation through the configured language model

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::services::ai::AiProvider;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GerarLaudoRequest {
    pub texto: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GerarLaudoResponse {
    pub laudo: String,
}

#[derive(Debug, Serialize)]
pub struct AiStatusResponse {
    pub provider: AiProvider,
    pub disponiveis: Vec<AiProvider>,
}

/// POST /api/gerar_laudo
pub async fn gerar_laudo(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GerarLaudoRequest>,
) -> ApiResult<Json<GerarLaudoResponse>> {
    let texto = request
        .texto
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("texto é obrigatório".to_string()))?;

    let reports = state
        .ai
        .reports
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Serviço de IA não configurado".to_string()))?;

    // Provider details are logged by the service
    let laudo = reports
        .generate_report(texto)
        .await
        .map_err(|_| ApiError::Internal("Não foi possível gerar o laudo".to_string()))?;

    Ok(Json(GerarLaudoResponse { laudo }))
}

/// GET /api/ai/status
pub async fn ai_status(State(state): State<AppState>) -> Json<AiStatusResponse> {
    Json(AiStatusResponse {
        provider: state.ai.provider,
        disponiveis: state.ai.available.clone(),
    })
}
