use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_episodes_series_number ON episodes(series_id, episode_number)",
        )
        .await?;

        // Access checks and "my passes" filter on (user_id, series_id, status)
        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_season_passes_user_series ON season_passes(user_id, series_id, status)",
        )
        .await?;

        // Expiry sweep scans pending orders by age
        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_season_passes_status_created ON season_passes(status, created_at)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_season_passes_status_created")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_season_passes_user_series")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_episodes_series_number")
            .await?;

        Ok(())
    }
}
