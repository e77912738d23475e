use crate::domain::{Money, SeriesId};
use crate::entities::{episodes, prelude::*, series};
use crate::models::series::{Episode, EpisodeInput, Series as SeriesRecord, SeriesInput};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

/// Repository for series and their episodes
pub struct SeriesRepository {
    conn: DatabaseConnection,
}

impl SeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Model Conversion Helpers
    // ========================================================================

    pub(crate) fn map_series_model(m: series::Model) -> SeriesRecord {
        SeriesRecord {
            id: SeriesId::new(m.id),
            title: m.title,
            description: m.description,
            poster_url: m.poster_url,
            total_episodes: m.total_episodes,
            free_episodes_count: m.free_episodes_count,
            season_pass_price: m.season_pass_price.map(Money::from_minor),
            created_at: m.created_at,
        }
    }

    fn map_episode_model(m: episodes::Model) -> Episode {
        Episode {
            id: m.id,
            series_id: SeriesId::new(m.series_id),
            episode_number: m.episode_number,
            title: m.title,
            video_url: m.video_url,
            thumbnail_url: m.thumbnail_url,
            duration_seconds: m.duration_seconds,
        }
    }

    // ========================================================================
    // Series Operations
    // ========================================================================

    pub async fn get(&self, id: SeriesId) -> Result<Option<SeriesRecord>> {
        let row = Series::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query series")?;

        Ok(row.map(Self::map_series_model))
    }

    pub async fn list(&self) -> Result<Vec<SeriesRecord>> {
        let rows = Series::find()
            .order_by_asc(series::Column::Title)
            .all(&self.conn)
            .await
            .context("Failed to list series")?;

        Ok(rows.into_iter().map(Self::map_series_model).collect())
    }

    pub async fn create(&self, input: &SeriesInput) -> Result<SeriesRecord> {
        let active = series::ActiveModel {
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            poster_url: Set(input.poster_url.clone()),
            total_episodes: Set(input.total_episodes),
            free_episodes_count: Set(input.free_episodes_count),
            season_pass_price: Set(input.season_pass_price.map(|p| p.minor())),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert series")?;
        info!("Created series {}: {}", model.id, model.title);

        Ok(Self::map_series_model(model))
    }

    // ========================================================================
    // Episode Operations
    // ========================================================================

    pub async fn list_episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
        let rows = Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id.value()))
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await
            .context("Failed to list episodes")?;

        Ok(rows.into_iter().map(Self::map_episode_model).collect())
    }

    pub async fn get_episode(
        &self,
        series_id: SeriesId,
        episode_number: i32,
    ) -> Result<Option<Episode>> {
        let row = Episodes::find()
            .filter(episodes::Column::SeriesId.eq(series_id.value()))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(&self.conn)
            .await
            .context("Failed to query episode")?;

        Ok(row.map(Self::map_episode_model))
    }

    pub async fn add_episode(&self, series_id: SeriesId, input: &EpisodeInput) -> Result<Episode> {
        let active = episodes::ActiveModel {
            series_id: Set(series_id.value()),
            episode_number: Set(input.episode_number),
            title: Set(input.title.clone()),
            video_url: Set(input.video_url.clone()),
            thumbnail_url: Set(input.thumbnail_url.clone()),
            duration_seconds: Set(input.duration_seconds),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert episode")?;

        Ok(Self::map_episode_model(model))
    }
}
