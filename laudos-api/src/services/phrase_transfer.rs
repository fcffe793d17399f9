//! Phrase transfer between report templates
//!
//! Copies, moves or duplicates a batch of phrases from a source template to a
//! destination template owned by the same user.
//!
//! Request validation runs in a fixed order and stops at the first failure.
//! The input-only checks need no database access; the ownership and
//! membership checks run inside the same transaction as the link changes, so
//! a rejected or failed batch leaves no trace. The transaction holds the write
//! lock from the start: concurrent transfers run one after another and each
//! validates against the previous one's committed links.

use std::collections::HashSet;
use std::str::FromStr;

use laudos_common::db::begin_write;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{frases, modelos};

/// Transfer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Add the destination link, keep the source link
    Copiar,
    /// Replace the source link with the destination link
    Mover,
    /// Create a new phrase linked only to the destination
    Duplicar,
}

impl FromStr for TransferMode {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copiar" => Ok(TransferMode::Copiar),
            "mover" => Ok(TransferMode::Mover),
            "duplicar" => Ok(TransferMode::Duplicar),
            _ => Err(TransferError::InvalidRequest(
                "modo_operacao deve ser copiar, mover ou duplicar".to_string(),
            )),
        }
    }
}

/// Transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    /// Malformed or inconsistent request (400)
    #[error("{0}")]
    InvalidRequest(String),

    /// Template missing or owned by another user (404)
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] laudos_common::Error),
}

impl From<sqlx::Error> for TransferError {
    fn from(err: sqlx::Error) -> Self {
        TransferError::Storage(err.into())
    }
}

/// Raw request body
///
/// Fields stay untyped so each shape error surfaces at its own validation step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub modelo_origem_id: Option<Value>,
    #[serde(default)]
    pub modelo_destino_id: Option<Value>,
    #[serde(default)]
    pub frases_ids: Option<Value>,
    #[serde(default)]
    pub modo_operacao: Option<Value>,
}

/// Request that passed the input-only checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub origem: i64,
    pub destino: i64,
    /// Distinct ids, first-occurrence order
    pub frase_ids: Vec<i64>,
    pub modo: TransferMode,
}

/// Per-batch counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub total: usize,
    /// Phrases whose links or records actually changed
    pub processadas: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ja_existiam: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicadas: Option<usize>,
}

/// Response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub success: bool,
    pub mensagem: String,
    pub estatisticas: TransferStats,
}

/// Input-only checks, in order: template ids present, phrase id list, mode,
/// source differs from destination
pub fn plan_transfer(request: &TransferRequest) -> Result<TransferPlan, TransferError> {
    let (Some(origem), Some(destino)) = (
        template_id(request.modelo_origem_id.as_ref()),
        template_id(request.modelo_destino_id.as_ref()),
    ) else {
        return Err(TransferError::InvalidRequest(
            "modelo_origem_id e modelo_destino_id são obrigatórios".to_string(),
        ));
    };

    let frase_ids = phrase_ids(request.frases_ids.as_ref())?;

    let modo = match request.modo_operacao.as_ref().and_then(Value::as_str) {
        Some(raw) => raw.parse::<TransferMode>()?,
        None => {
            return Err(TransferError::InvalidRequest(
                "modo_operacao é obrigatório".to_string(),
            ))
        }
    };

    if origem == destino {
        return Err(TransferError::InvalidRequest(
            "O modelo de origem deve ser diferente do modelo de destino".to_string(),
        ));
    }

    Ok(TransferPlan {
        origem,
        destino,
        frase_ids,
        modo,
    })
}

/// Integer id, or a string holding one
fn template_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn phrase_ids(value: Option<&Value>) -> Result<Vec<i64>, TransferError> {
    let invalid = || {
        TransferError::InvalidRequest("frases_ids deve ser uma lista não vazia de ids".to_string())
    };

    let items = value.and_then(Value::as_array).ok_or_else(invalid)?;
    if items.is_empty() {
        return Err(invalid());
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_i64().ok_or_else(invalid)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

/// Validate and apply a transfer for `usuario_id` in one transaction
pub async fn transfer_phrases(
    pool: &SqlitePool,
    usuario_id: i64,
    request: &TransferRequest,
) -> Result<TransferOutcome, TransferError> {
    let plan = plan_transfer(request)?;
    let mut tx = begin_write(pool, "transfer_phrases").await?;

    if modelos::get_modelo(&mut *tx, plan.origem, usuario_id).await?.is_none() {
        return Err(TransferError::NotFound(
            "Modelo de origem não encontrado".to_string(),
        ));
    }
    if modelos::get_modelo(&mut *tx, plan.destino, usuario_id).await?.is_none() {
        return Err(TransferError::NotFound(
            "Modelo de destino não encontrado".to_string(),
        ));
    }

    let in_source = frases::frase_ids_linked_to(&mut tx, plan.origem, usuario_id).await?;
    let foreign: Vec<String> = plan
        .frase_ids
        .iter()
        .filter(|id| !in_source.contains(*id))
        .map(|id| id.to_string())
        .collect();
    if !foreign.is_empty() {
        return Err(TransferError::InvalidRequest(format!(
            "Frases não pertencem ao modelo de origem: {}",
            foreign.join(", ")
        )));
    }

    let mut stats = TransferStats {
        total: plan.frase_ids.len(),
        ..Default::default()
    };

    match plan.modo {
        TransferMode::Copiar => {
            let mut ja_existiam = 0;
            for &frase_id in &plan.frase_ids {
                if frases::add_link(&mut tx, frase_id, plan.destino).await? {
                    stats.processadas += 1;
                } else {
                    ja_existiam += 1;
                }
            }
            stats.ja_existiam = Some(ja_existiam);
        }
        TransferMode::Mover => {
            for &frase_id in &plan.frase_ids {
                let removed = frases::remove_link(&mut tx, frase_id, plan.origem).await?;
                let added = frases::add_link(&mut tx, frase_id, plan.destino).await?;
                if removed || added {
                    stats.processadas += 1;
                }
            }
        }
        TransferMode::Duplicar => {
            let mut duplicadas = 0;
            for &frase_id in &plan.frase_ids {
                let Some(original) = frases::get_frase(&mut tx, frase_id, usuario_id).await? else {
                    return Err(TransferError::NotFound(format!(
                        "Frase {} não encontrada",
                        frase_id
                    )));
                };
                let copy_id = frases::insert_frase(
                    &mut tx,
                    usuario_id,
                    &original.categoria_frase,
                    &original.titulo_frase,
                    &original.frase,
                )
                .await?;
                frases::add_link(&mut tx, copy_id, plan.destino).await?;
                debug!(original = frase_id, copy = copy_id, "Phrase duplicated");
                duplicadas += 1;
            }
            stats.processadas = duplicadas;
            stats.duplicadas = Some(duplicadas);
        }
    }

    tx.commit().await?;

    info!(
        usuario_id,
        origem = plan.origem,
        destino = plan.destino,
        modo = ?plan.modo,
        total = stats.total,
        processadas = stats.processadas,
        "Phrase transfer applied"
    );

    Ok(TransferOutcome {
        success: true,
        mensagem: summary_message(plan.modo, &stats),
        estatisticas: stats,
    })
}

fn summary_message(modo: TransferMode, stats: &TransferStats) -> String {
    match modo {
        TransferMode::Copiar => {
            let ja_existiam = stats.ja_existiam.unwrap_or(0);
            if ja_existiam > 0 {
                format!(
                    "{} frase(s) copiada(s) com sucesso; {} já existia(m) no modelo de destino",
                    stats.processadas, ja_existiam
                )
            } else {
                format!("{} frase(s) copiada(s) com sucesso", stats.processadas)
            }
        }
        TransferMode::Mover => format!("{} frase(s) movida(s) com sucesso", stats.processadas),
        TransferMode::Duplicar => format!(
            "{} frase(s) duplicada(s) com sucesso",
            stats.duplicadas.unwrap_or(0)
        ),
    }
}
