//! `SeaORM` implementation of the `CatalogService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{Store, User};
use crate::domain::{Money, SeriesId};
use crate::models::coupon::{CouponInput, normalize_code};
use crate::models::series::{EpisodeInput, Series, SeriesInput};
use crate::services::catalog_service::{
    CatalogError, CatalogService, CouponView, EpisodeView, SeriesView, validate_coupon_input,
    validate_episode_input, validate_series_input,
};

pub struct SeaOrmCatalogService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    async fn require_series(&self, id: SeriesId) -> Result<Series, CatalogError> {
        self.store
            .get_series(id)
            .await?
            .ok_or(CatalogError::SeriesNotFound(id))
    }

    async fn to_view(&self, series: Series) -> SeriesView {
        let config = self.config.read().await;
        SeriesView {
            id: series.id,
            title: series.title,
            description: series.description,
            poster_url: series.poster_url,
            total_episodes: series.total_episodes,
            free_episodes_count: series.free_episodes_count,
            season_pass_price: series
                .season_pass_price
                .unwrap_or_else(|| Money::from_major(config.season_pass.default_price)),
            currency: config.season_pass.currency.clone(),
        }
    }

    async fn viewer_has_pass(
        &self,
        viewer: Option<&User>,
        series_id: SeriesId,
    ) -> Result<bool, CatalogError> {
        let Some(user) = viewer else {
            return Ok(false);
        };
        Ok(self.store.find_active_pass(user.id, series_id).await?.is_some())
    }
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list_series(&self) -> Result<Vec<SeriesView>, CatalogError> {
        let series = self.store.list_series().await?;
        let mut views = Vec::with_capacity(series.len());
        for s in series {
            views.push(self.to_view(s).await);
        }
        Ok(views)
    }

    async fn get_series(&self, id: SeriesId) -> Result<SeriesView, CatalogError> {
        let series = self.require_series(id).await?;
        Ok(self.to_view(series).await)
    }

    async fn list_episodes(
        &self,
        series_id: SeriesId,
        viewer: Option<&User>,
    ) -> Result<Vec<EpisodeView>, CatalogError> {
        let series = self.require_series(series_id).await?;
        let has_pass = self.viewer_has_pass(viewer, series_id).await?;

        let episodes = self.store.list_episodes(series_id).await?;
        Ok(episodes
            .into_iter()
            .map(|ep| {
                let locked = !has_pass && !series.is_free_episode(ep.episode_number);
                EpisodeView::from_episode(ep, locked)
            })
            .collect())
    }

    async fn get_episode(
        &self,
        series_id: SeriesId,
        number: i32,
        viewer: Option<&User>,
    ) -> Result<EpisodeView, CatalogError> {
        let series = self.require_series(series_id).await?;
        let episode = self
            .store
            .get_episode(series_id, number)
            .await?
            .ok_or(CatalogError::EpisodeNotFound { series_id, number })?;

        if !series.is_free_episode(number) && !self.viewer_has_pass(viewer, series_id).await? {
            return Err(CatalogError::EpisodeLocked { series_id, number });
        }

        Ok(EpisodeView::from_episode(episode, false))
    }

    async fn create_series(&self, input: SeriesInput) -> Result<SeriesView, CatalogError> {
        validate_series_input(&input)?;
        let series = self.store.create_series(&input).await?;
        Ok(self.to_view(series).await)
    }

    async fn add_episode(
        &self,
        series_id: SeriesId,
        input: EpisodeInput,
    ) -> Result<EpisodeView, CatalogError> {
        let series = self.require_series(series_id).await?;
        validate_episode_input(&input, series.total_episodes)?;

        if self
            .store
            .get_episode(series_id, input.episode_number)
            .await?
            .is_some()
        {
            return Err(CatalogError::Conflict(format!(
                "פרק {} כבר קיים",
                input.episode_number
            )));
        }

        let episode = self.store.add_episode(series_id, &input).await?;
        info!(series_id = %series_id, episode = episode.episode_number, "Episode added");
        Ok(EpisodeView::from_episode(episode, false))
    }

    async fn create_coupon(&self, mut input: CouponInput) -> Result<CouponView, CatalogError> {
        validate_coupon_input(&input)?;
        input.code = normalize_code(&input.code);

        if let Some(series_id) = input.series_id {
            self.require_series(series_id).await?;
        }

        if self.store.get_coupon(&input.code).await?.is_some() {
            return Err(CatalogError::Conflict(format!(
                "קופון {} כבר קיים",
                input.code
            )));
        }

        let coupon = self.store.create_coupon(&input).await?;
        Ok(CouponView::from(coupon))
    }

    async fn list_coupons(&self) -> Result<Vec<CouponView>, CatalogError> {
        let coupons = self.store.list_coupons().await?;
        Ok(coupons.into_iter().map(CouponView::from).collect())
    }
}
