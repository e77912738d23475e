//! Domain service for series browsing, episode gating and catalog administration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{DiscountType, Money, SeriesId};
use crate::models::coupon::{Coupon, CouponInput, normalize_code};
use crate::models::series::{Episode, EpisodeInput, SeriesInput};

/// Errors specific to catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Series not found: {0}")]
    SeriesNotFound(SeriesId),

    #[error("Episode {number} not found in series {series_id}")]
    EpisodeNotFound { series_id: SeriesId, number: i32 },

    #[error("Episode {number} of series {series_id} requires a season pass")]
    EpisodeLocked { series_id: SeriesId, number: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesView {
    pub id: SeriesId,
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub total_episodes: i32,
    pub free_episodes_count: i32,
    pub season_pass_price: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeView {
    pub id: i32,
    pub series_id: SeriesId,
    pub episode_number: i32,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl EpisodeView {
    #[must_use]
    pub fn from_episode(episode: Episode, is_locked: bool) -> Self {
        Self {
            id: episode.id,
            series_id: episode.series_id,
            episode_number: episode.episode_number,
            title: episode.title,
            thumbnail_url: episode.thumbnail_url,
            duration_seconds: episode.duration_seconds,
            is_locked,
            video_url: (!is_locked).then_some(episode.video_url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponView {
    pub id: i32,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub series_id: Option<SeriesId>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Coupon> for CouponView {
    fn from(c: Coupon) -> Self {
        Self {
            id: c.id,
            code: c.code,
            discount_type: c.discount_type,
            discount_value: c.discount_value,
            series_id: c.series_id,
            max_uses: c.max_uses,
            used_count: c.used_count,
            valid_from: c.valid_from,
            valid_until: c.valid_until,
            is_active: c.is_active,
            created_at: c.created_at,
        }
    }
}

/// Domain service trait for the series catalog.
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_series(&self) -> Result<Vec<SeriesView>, CatalogError>;

    async fn get_series(&self, id: SeriesId) -> Result<SeriesView, CatalogError>;

    /// Episodes with lock state computed for `viewer`.
    async fn list_episodes(
        &self,
        series_id: SeriesId,
        viewer: Option<&User>,
    ) -> Result<Vec<EpisodeView>, CatalogError>;

    /// # Errors
    ///
    /// Returns [`CatalogError::EpisodeLocked`] when the viewer may not play it.
    async fn get_episode(
        &self,
        series_id: SeriesId,
        number: i32,
        viewer: Option<&User>,
    ) -> Result<EpisodeView, CatalogError>;

    async fn create_series(&self, input: SeriesInput) -> Result<SeriesView, CatalogError>;

    async fn add_episode(
        &self,
        series_id: SeriesId,
        input: EpisodeInput,
    ) -> Result<EpisodeView, CatalogError>;

    async fn create_coupon(&self, input: CouponInput) -> Result<CouponView, CatalogError>;

    async fn list_coupons(&self) -> Result<Vec<CouponView>, CatalogError>;
}

// ============================================================================
// Input validation
// ============================================================================

pub fn validate_series_input(input: &SeriesInput) -> Result<(), CatalogError> {
    if input.title.trim().is_empty() {
        return Err(CatalogError::Validation("שם הסדרה הוא שדה חובה".to_string()));
    }
    if input.total_episodes < 0 || input.free_episodes_count < 0 {
        return Err(CatalogError::Validation(
            "מספר הפרקים אינו יכול להיות שלילי".to_string(),
        ));
    }
    if input.free_episodes_count > input.total_episodes {
        return Err(CatalogError::Validation(
            "מספר הפרקים החינמיים אינו יכול לעלות על מספר הפרקים הכולל".to_string(),
        ));
    }
    if input.season_pass_price.is_some_and(|p| !p.is_positive()) {
        return Err(CatalogError::Validation(
            "מחיר המנוי העונתי חייב להיות חיובי".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_episode_input(input: &EpisodeInput, total_episodes: i32) -> Result<(), CatalogError> {
    if input.episode_number < 1 || input.episode_number > total_episodes {
        return Err(CatalogError::Validation(format!(
            "מספר הפרק חייב להיות בין 1 ל-{total_episodes}"
        )));
    }
    if input.video_url.trim().is_empty() {
        return Err(CatalogError::Validation("כתובת הווידאו היא שדה חובה".to_string()));
    }
    Ok(())
}

pub fn validate_coupon_input(input: &CouponInput) -> Result<(), CatalogError> {
    let code = normalize_code(&input.code);
    if !(3..=32).contains(&code.len())
        || !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(CatalogError::Validation(
            "קוד קופון חייב להכיל 3-32 תווים מתוך A-Z, 0-9, '_' או '-'".to_string(),
        ));
    }

    let value = input.discount_value;
    match input.discount_type {
        DiscountType::Percentage if !(value > 0.0 && value <= 100.0) => {
            return Err(CatalogError::Validation(
                "הנחה באחוזים חייבת להיות גדולה מ-0 ועד 100".to_string(),
            ));
        }
        DiscountType::Fixed if !(value > 0.0 && value.is_finite()) => {
            return Err(CatalogError::Validation(
                "הנחה בסכום קבוע חייבת להיות חיובית".to_string(),
            ));
        }
        _ => {}
    }

    if let (Some(from), Some(until)) = (input.valid_from, input.valid_until)
        && from >= until
    {
        return Err(CatalogError::Validation(
            "תאריך תחילת התוקף חייב להקדים את תאריך הסיום".to_string(),
        ));
    }

    if input.max_uses.is_some_and(|m| m < 1) {
        return Err(CatalogError::Validation(
            "מספר השימושים המרבי חייב להיות לפחות 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon_input() -> CouponInput {
        CouponInput {
            code: "launch-20".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 20.0,
            series_id: None,
            max_uses: Some(100),
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn coupon_code_is_normalized_before_validation() {
        assert!(validate_coupon_input(&coupon_input()).is_ok());

        let mut bad = coupon_input();
        bad.code = "no spaces".to_string();
        assert!(validate_coupon_input(&bad).is_err());

        bad.code = "AB".to_string();
        assert!(validate_coupon_input(&bad).is_err());
    }

    #[test]
    fn discount_value_ranges() {
        let mut input = coupon_input();
        input.discount_value = 100.0;
        assert!(validate_coupon_input(&input).is_ok());

        input.discount_value = 100.5;
        assert!(validate_coupon_input(&input).is_err());

        input.discount_value = 0.0;
        assert!(validate_coupon_input(&input).is_err());

        input.discount_type = DiscountType::Fixed;
        input.discount_value = 250.0;
        assert!(validate_coupon_input(&input).is_ok());

        input.discount_value = -1.0;
        assert!(validate_coupon_input(&input).is_err());
    }

    #[test]
    fn validity_window_must_be_ordered() {
        let now = Utc::now();
        let mut input = coupon_input();
        input.valid_from = Some(now);
        input.valid_until = Some(now - Duration::hours(1));
        assert!(validate_coupon_input(&input).is_err());

        input.valid_until = Some(now + Duration::days(7));
        assert!(validate_coupon_input(&input).is_ok());
    }

    #[test]
    fn free_episodes_cannot_exceed_total() {
        let mut input = SeriesInput {
            title: "The Heiress".to_string(),
            description: None,
            poster_url: None,
            total_episodes: 40,
            free_episodes_count: 5,
            season_pass_price: None,
        };
        assert!(validate_series_input(&input).is_ok());

        input.free_episodes_count = 41;
        assert!(matches!(
            validate_series_input(&input),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn locked_episode_hides_video_url() {
        let episode = Episode {
            id: 1,
            series_id: SeriesId::new(1),
            episode_number: 6,
            title: None,
            video_url: "https://cdn.example/6.m3u8".to_string(),
            thumbnail_url: None,
            duration_seconds: Some(90),
        };

        let view = EpisodeView::from_episode(episode.clone(), true);
        assert!(view.video_url.is_none());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("videoUrl").is_none());
        assert_eq!(json["isLocked"], true);

        let view = EpisodeView::from_episode(episode, false);
        assert_eq!(view.video_url.as_deref(), Some("https://cdn.example/6.m3u8"));
    }
}
