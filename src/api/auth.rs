use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::User;
use crate::services::{AuthError, LoginResult, UserInfo};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// Resolved caller, stored as a request extension by the auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthorized("אימייל או סיסמה שגויים".to_string())
            }
            AuthError::EmailTaken => Self::Conflict("כתובת האימייל כבר רשומה".to_string()),
            AuthError::UserNotFound => Self::NotFound("המשתמש לא נמצא".to_string()),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Unauthorized => Self::unauthorized(),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects the request unless `X-Api-Key` or `Authorization: Bearer` resolves to a user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, &headers)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    tracing::Span::current().record("user_id", user.id.value());
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Attaches the user when a valid key is present; anonymous requests pass through.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user) = resolve_user(&state, &headers).await? {
        tracing::Span::current().record("user_id", user.id.value());
        request.extensions_mut().insert(CurrentUser(user));
    }
    Ok(next.run(request).await)
}

/// Layered after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|CurrentUser(user)| user.is_admin);

    if !is_admin {
        return Err(ApiError::Forbidden("נדרשות הרשאות מנהל".to_string()));
    }
    Ok(next.run(request).await)
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(key) = extract_api_key(headers) else {
        return Ok(None);
    };
    Ok(state.auth_service().verify_api_key(&key).await?)
}

/// Extract API key from headers
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
        && !key_str.trim().is_empty()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .auth_service()
        .register(&payload.email, &payload.password)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::<LoginResult>::success(result)),
    ))
}

/// POST /auth/login
/// Returns the API key to send as a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("יש להזין אימייל וסיסמה"));
    }

    let result = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let info = state.auth_service().get_user_info(user.id).await?;
    Ok(Json(ApiResponse::success(info)))
}

/// POST /auth/api-key/regenerate
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state.auth_service().regenerate_api_key(user.id).await?;

    tracing::info!(user_id = %user.id, "API key regenerated");

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}
