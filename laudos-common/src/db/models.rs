//! Database models
//!
//! Field names on the wire follow the report editor's existing JSON contract
//! (`categoriaFrase`, `tituloVariavel`, ...), hence the serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Account owning templates, phrases and variables
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nome_completo: String,
    pub telefone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            nome_completo: row.try_get("nome_completo")?,
            telefone: row.try_get("telefone")?,
            password_hash: row.try_get("password_hash")?,
            is_active: row.try_get("is_active")?,
            date_joined: row.try_get("date_joined")?,
        })
    }
}

/// Exam method (ultrasound, CT, ...), shared by all users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metodo {
    pub id: i64,
    pub metodo: String,
}

impl Metodo {
    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            metodo: row.try_get("metodo")?,
        })
    }
}

/// Report template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeloLaudo {
    pub id: i64,
    pub titulo: String,
    pub texto: String,
    /// Method id
    pub metodo: i64,
    /// Owner id
    pub usuario: i64,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl ModeloLaudo {
    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            titulo: row.try_get("titulo")?,
            texto: row.try_get("texto")?,
            metodo: row.try_get("metodo_id")?,
            usuario: row.try_get("usuario_id")?,
            criado_em: row.try_get("criado_em")?,
            atualizado_em: row.try_get("atualizado_em")?,
        })
    }
}

/// Reusable phrase, linked to zero or more templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frase {
    pub id: i64,
    #[serde(rename = "categoriaFrase")]
    pub categoria_frase: String,
    #[serde(rename = "tituloFrase")]
    pub titulo_frase: String,
    /// Structured payload
    pub frase: Value,
    /// Linked template ids, ascending
    pub modelos_laudo: Vec<i64>,
    pub usuario: i64,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl Frase {
    /// Build from a `frases` row; links are loaded separately
    pub fn from_row(row: &SqliteRow) -> crate::Result<Self> {
        let payload: String = row.try_get("frase")?;
        Ok(Self {
            id: row.try_get("id")?,
            categoria_frase: row.try_get("categoria_frase")?,
            titulo_frase: row.try_get("titulo_frase")?,
            frase: serde_json::from_str(&payload)?,
            modelos_laudo: Vec::new(),
            usuario: row.try_get("usuario_id")?,
            criado_em: row.try_get("criado_em")?,
            atualizado_em: row.try_get("atualizado_em")?,
        })
    }
}

/// Free-form template variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variavel {
    pub id: i64,
    #[serde(rename = "tituloVariavel")]
    pub titulo_variavel: String,
    pub variavel: Value,
    pub usuario: i64,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl Variavel {
    pub fn from_row(row: &SqliteRow) -> crate::Result<Self> {
        let payload: String = row.try_get("variavel")?;
        Ok(Self {
            id: row.try_get("id")?,
            titulo_variavel: row.try_get("titulo_variavel")?,
            variavel: serde_json::from_str(&payload)?,
            usuario: row.try_get("usuario_id")?,
            criado_em: row.try_get("criado_em")?,
            atualizado_em: row.try_get("atualizado_em")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_frase_serializes_with_wire_names() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let frase = Frase {
            id: 5,
            categoria_frase: "Fígado".to_string(),
            titulo_frase: "Normal".to_string(),
            frase: json!({"texto": "Fígado de dimensões normais."}),
            modelos_laudo: vec![1, 2],
            usuario: 3,
            criado_em: ts,
            atualizado_em: ts,
        };

        let value = serde_json::to_value(&frase).unwrap();
        assert_eq!(value["categoriaFrase"], "Fígado");
        assert_eq!(value["tituloFrase"], "Normal");
        assert_eq!(value["modelos_laudo"], json!([1, 2]));
        assert!(value.get("categoria_frase").is_none());
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            id: 1,
            email: "dr@example.com".to_string(),
            nome_completo: "Dra. Ana".to_string(),
            telefone: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };

        let text = serde_json::to_string(&user).unwrap();
        assert!(!text.contains("argon2"));
        assert!(!text.contains("password_hash"));
    }
}
