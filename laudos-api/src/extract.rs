//! Request extractors that reject with the API's JSON error body

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body; malformed or mistyped bodies become 400 `{error}`
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Integer record id from the path; anything else is an unknown record
pub struct RecordId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(RecordId(id)),
            Err(_) => Err(ApiError::NotFound("Não encontrado.".to_string())),
        }
    }
}

/// Parse an optional integer query parameter (blank = absent)
pub fn parse_optional_id(name: &str, raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{} inválido", name))),
    }
}

/// Non-blank string parameter
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.trim().is_empty())
}
