//! Bearer-token authentication: middleware and account endpoints
//!
//! The middleware accepts only access tokens, loads the account they name
//! and stores it in request extensions as [`CurrentUser`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use laudos_common::api::{
    auth::{is_plausible_email, normalize_email},
    hash_password, verify_password, AccessResponse, AuthError, AuthResponse, LoginRequest,
    RefreshRequest, RegisterRequest, TokenType, UserSummary,
};
use laudos_common::db::User;
use tracing::{debug, info, warn};

use crate::db::users::{self, NewUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::services::seed_new_user;
use crate::AppState;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_TOKEN: &str = "Token inválido ou expirado";

/// Authenticated account attached to the request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// Authentication middleware for protected routes
///
/// Returns 401 when the header is missing or malformed, the token is invalid,
/// expired or a refresh token, or the account is unknown or inactive.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("As credenciais de autenticação não foram fornecidas.".to_string())
        })?;

    let claims = state
        .tokens
        .validate(token, TokenType::Access)
        .map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized(INVALID_TOKEN.to_string())
        })?;

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized(INVALID_TOKEN.to_string()))?;

    let user = users::get_user_by_id(&state.db, user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Usuário não encontrado ou inativo".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

fn internal_auth_error(err: AuthError) -> ApiError {
    warn!(error = %err, "Authentication backend failure");
    ApiError::Internal("Erro interno do servidor".to_string())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(required(&request.email, "email é obrigatório")?);
    let nome_completo = required(&request.nome_completo, "nome_completo é obrigatório")?;
    let telefone = required(&request.telefone, "telefone é obrigatório")?;
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("password é obrigatório".to_string()))?;

    if !is_plausible_email(&email) {
        return Err(ApiError::BadRequest("Informe um endereço de email válido.".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "A senha deve ter pelo menos {} caracteres.",
            MIN_PASSWORD_LEN
        )));
    }
    if users::email_exists(&state.db, &email).await? {
        return Err(ApiError::BadRequest(
            "Já existe um usuário com este email.".to_string(),
        ));
    }

    let password_hash = hash_password(password).map_err(internal_auth_error)?;
    let new_user = NewUser {
        email,
        nome_completo: nome_completo.to_string(),
        telefone: telefone.to_string(),
        password_hash,
    };

    let user = users::create_user(&state.db, &new_user).await.map_err(|e| match e {
        // Lost a race with a concurrent registration for the same email
        laudos_common::Error::Database(sqlx::Error::Database(db_err))
            if db_err.is_unique_violation() =>
        {
            ApiError::BadRequest("Já existe um usuário com este email.".to_string())
        }
        other => other.into(),
    })?;

    info!(user_id = user.id, "User registered");

    if let Some(seed_email) = state.seed_user_email.as_deref() {
        if let Err(e) = seed_new_user(&state.db, seed_email, user.id).await {
            warn!(user_id = user.id, error = %e, "Failed to copy starter content to new user");
        }
    }

    let body = auth_response(&state, &user)?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(required(&request.email, "email é obrigatório")?);
    let password = request
        .password
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("password é obrigatório".to_string()))?;

    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Usuário não encontrado.".to_string()))?;

    if !verify_password(password, &user.password_hash).map_err(internal_auth_error)? {
        return Err(ApiError::BadRequest("Senha incorreta.".to_string()));
    }
    if !user.is_active {
        return Err(ApiError::BadRequest("Usuário inativo.".to_string()));
    }

    info!(user_id = user.id, "User logged in");
    Ok(Json(auth_response(&state, &user)?))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> ApiResult<Json<AccessResponse>> {
    let token = required(&request.refresh, "refresh é obrigatório")?;

    let access = state.tokens.refresh_access(token).map_err(|e| match e {
        AuthError::Encoding(_) => internal_auth_error(e),
        _ => {
            debug!(error = %e, "Rejected refresh token");
            ApiError::Unauthorized(INVALID_TOKEN.to_string())
        }
    })?;

    Ok(Json(AccessResponse { access }))
}

/// GET /api/auth/me
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserSummary> {
    Json(UserSummary::from(&user.0))
}

fn auth_response(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let pair = state
        .tokens
        .issue_pair(user.id, &user.email)
        .map_err(internal_auth_error)?;

    Ok(AuthResponse {
        refresh: pair.refresh,
        access: pair.access,
        user: UserSummary::from(user),
    })
}
