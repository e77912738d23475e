use crate::config::SecurityConfig;
use crate::domain::{OrderStatus, SeriesId, UserId};
use crate::models::coupon::{Coupon, CouponInput};
use crate::models::season_pass::{NewSeasonPass, SeasonPass};
use crate::models::series::{Episode, EpisodeInput, Series, SeriesInput};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn series_repo(&self) -> repositories::series::SeriesRepository {
        repositories::series::SeriesRepository::new(self.conn.clone())
    }

    fn coupon_repo(&self) -> repositories::coupon::CouponRepository {
        repositories::coupon::CouponRepository::new(self.conn.clone())
    }

    fn season_pass_repo(&self) -> repositories::season_pass::SeasonPassRepository {
        repositories::season_pass::SeasonPassRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Series & Episodes
    // ========================================================================

    pub async fn get_series(&self, id: SeriesId) -> Result<Option<Series>> {
        self.series_repo().get(id).await
    }

    pub async fn list_series(&self) -> Result<Vec<Series>> {
        self.series_repo().list().await
    }

    pub async fn create_series(&self, input: &SeriesInput) -> Result<Series> {
        self.series_repo().create(input).await
    }

    pub async fn list_episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
        self.series_repo().list_episodes(series_id).await
    }

    pub async fn get_episode(&self, series_id: SeriesId, number: i32) -> Result<Option<Episode>> {
        self.series_repo().get_episode(series_id, number).await
    }

    pub async fn add_episode(&self, series_id: SeriesId, input: &EpisodeInput) -> Result<Episode> {
        self.series_repo().add_episode(series_id, input).await
    }

    // ========================================================================
    // Coupons
    // ========================================================================

    pub async fn get_coupon(&self, code: &str) -> Result<Option<Coupon>> {
        self.coupon_repo().get_by_code(code).await
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        self.coupon_repo().list_all().await
    }

    pub async fn create_coupon(&self, input: &CouponInput) -> Result<Coupon> {
        self.coupon_repo().create(input).await
    }

    pub async fn reserve_coupon_use(&self, code: &str) -> Result<bool> {
        self.coupon_repo().reserve_use(code).await
    }

    pub async fn release_coupon_use(&self, code: &str) -> Result<bool> {
        self.coupon_repo().release_use(code).await
    }

    // ========================================================================
    // Season Pass Orders
    // ========================================================================

    pub async fn insert_order(&self, order: &NewSeasonPass) -> Result<SeasonPass> {
        self.season_pass_repo().insert(order).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<SeasonPass>> {
        self.season_pass_repo().get_by_order_id(order_id).await
    }

    pub async fn activate_order(
        &self,
        order_id: &str,
        from: OrderStatus,
        transaction_id: Option<&str>,
        purchased_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.season_pass_repo()
            .activate(order_id, from, transaction_id, purchased_at)
            .await
    }

    pub async fn transition_order(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        self.season_pass_repo().transition(order_id, from, to).await
    }

    pub async fn set_order_invoice(
        &self,
        order_id: &str,
        invoice_url: Option<&str>,
        invoice_number: &str,
    ) -> Result<()> {
        self.season_pass_repo()
            .set_invoice(order_id, invoice_url, invoice_number)
            .await
    }

    pub async fn find_active_pass(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<SeasonPass>> {
        self.season_pass_repo().find_active(user_id, series_id).await
    }

    pub async fn list_active_passes(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(SeasonPass, Option<Series>)>> {
        self.season_pass_repo().list_active_with_series(user_id).await
    }

    pub async fn list_stale_pending_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<SeasonPass>> {
        self.season_pass_repo().list_pending_older_than(cutoff).await
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        is_admin: bool,
        security: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(email, password, is_admin, security)
            .await
    }

    /// Creates the configured admin, or promotes an existing account with that email.
    ///
    /// An existing account keeps its password.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<User> {
        let repo = self.user_repo();
        match repo.get_by_email(email).await? {
            Some(user) if user.is_admin => Ok(user),
            Some(mut user) => {
                repo.set_admin(user.id, true).await?;
                user.is_admin = true;
                Ok(user)
            }
            None => repo.create(email, password, true, security).await,
        }
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn regenerate_api_key(&self, id: UserId) -> Result<String> {
        self.user_repo().regenerate_api_key(id).await
    }
}
