use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_series_id;
use super::{ApiError, ApiResponse, AppState};
use crate::domain::{DiscountType, Money, SeriesId};
use crate::models::coupon::CouponInput;
use crate::models::series::{EpisodeInput, SeriesInput};
use crate::services::{CouponView, EpisodeView, SeriesView};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeriesBody {
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub total_episodes: i32,
    #[serde(default)]
    pub free_episodes_count: i32,
    pub season_pass_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEpisodeBody {
    pub episode_number: i32,
    pub title: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponBody {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub series_id: Option<SeriesId>,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /admin/series
pub async fn create_series(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSeriesBody>,
) -> Result<(StatusCode, Json<ApiResponse<SeriesView>>), ApiError> {
    let input = SeriesInput {
        title: body.title.trim().to_string(),
        description: body.description,
        poster_url: body.poster_url,
        total_episodes: body.total_episodes,
        free_episodes_count: body.free_episodes_count,
        season_pass_price: body.season_pass_price,
    };

    let series = state.catalog_service().create_series(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(series))))
}

/// POST /admin/series/{id}/episodes
pub async fn add_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<CreateEpisodeBody>,
) -> Result<(StatusCode, Json<ApiResponse<EpisodeView>>), ApiError> {
    let id = validate_series_id(id)?;
    let input = EpisodeInput {
        episode_number: body.episode_number,
        title: body.title,
        video_url: body.video_url,
        thumbnail_url: body.thumbnail_url,
        duration_seconds: body.duration_seconds,
    };

    let episode = state.catalog_service().add_episode(id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(episode))))
}

/// POST /admin/coupons
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCouponBody>,
) -> Result<(StatusCode, Json<ApiResponse<CouponView>>), ApiError> {
    let input = CouponInput {
        code: body.code,
        discount_type: body.discount_type,
        discount_value: body.discount_value,
        series_id: body.series_id,
        max_uses: body.max_uses,
        valid_from: body.valid_from,
        valid_until: body.valid_until,
        is_active: body.is_active,
    };

    let coupon = state.catalog_service().create_coupon(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(coupon))))
}

/// GET /admin/coupons
pub async fn list_coupons(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CouponView>>>, ApiError> {
    let coupons = state.catalog_service().list_coupons().await?;
    Ok(Json(ApiResponse::success(coupons)))
}
