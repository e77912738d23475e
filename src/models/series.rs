use chrono::{DateTime, Utc};

use crate::domain::{Money, SeriesId};

#[derive(Debug, Clone)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub total_episodes: i32,
    pub free_episodes_count: i32,
    pub season_pass_price: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl Series {
    /// Free episodes bypass the access check regardless of login state.
    #[must_use]
    pub const fn is_free_episode(&self, episode_number: i32) -> bool {
        episode_number <= self.free_episodes_count
    }
}

#[derive(Debug, Clone)]
pub struct SeriesInput {
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub total_episodes: i32,
    pub free_episodes_count: i32,
    pub season_pass_price: Option<Money>,
}

#[derive(Debug, Clone)]
pub struct Episode {
    pub id: i32,
    pub series_id: SeriesId,
    pub episode_number: i32,
    pub title: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct EpisodeInput {
    pub episode_number: i32,
    pub title: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
}
