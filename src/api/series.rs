use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_episode_number, validate_series_id};
use super::{ApiError, ApiResponse, AppState};
use crate::services::{CatalogError, EpisodeView, SeriesView};

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::SeriesNotFound(_) => Self::NotFound("הסדרה לא נמצאה".to_string()),
            CatalogError::EpisodeNotFound { .. } => Self::NotFound("הפרק לא נמצא".to_string()),
            CatalogError::EpisodeLocked { .. } => {
                Self::Forbidden("פרק זה זמין לבעלי מנוי עונתי בלבד".to_string())
            }
            CatalogError::Validation(msg) => Self::ValidationError(msg),
            CatalogError::Conflict(msg) => Self::Conflict(msg),
            CatalogError::Database(msg) => Self::DatabaseError(msg),
            CatalogError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// GET /series
pub async fn list_series(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<SeriesView>>>, ApiError> {
    let series = state.catalog_service().list_series().await?;
    Ok(Json(ApiResponse::success(series)))
}

/// GET /series/{id}
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SeriesView>>, ApiError> {
    let id = validate_series_id(id)?;
    let series = state.catalog_service().get_series(id).await?;
    Ok(Json(ApiResponse::success(series)))
}

/// GET /series/{id}/episodes
/// Locked episodes are listed without their video URL
pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<ApiResponse<Vec<EpisodeView>>>, ApiError> {
    let id = validate_series_id(id)?;
    let viewer = user.map(|Extension(CurrentUser(u))| u);

    let episodes = state
        .catalog_service()
        .list_episodes(id, viewer.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(episodes)))
}

/// GET /series/{id}/episodes/{number}
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path((id, number)): Path<(i32, i32)>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<ApiResponse<EpisodeView>>, ApiError> {
    let id = validate_series_id(id)?;
    let number = validate_episode_number(number)?;
    let viewer = user.map(|Extension(CurrentUser(u))| u);

    let episode = state
        .catalog_service()
        .get_episode(id, number, viewer.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(episode)))
}
