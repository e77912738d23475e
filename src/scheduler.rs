use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SeasonPassConfig;
use crate::services::SeasonPassService;

/// Runs the pending order expiry sweep on the configured cron schedule.
pub struct Scheduler {
    season_pass: Arc<dyn SeasonPassService>,
    config: SeasonPassConfig,
    running: Arc<RwLock<bool>>,
    sched: RwLock<Option<JobScheduler>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(season_pass: Arc<dyn SeasonPassService>, config: SeasonPassConfig) -> Self {
        Self {
            season_pass,
            config,
            running: Arc::new(RwLock::new(false)),
            sched: RwLock::new(None),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.expiry_sweep_enabled {
            info!("Order expiry sweep is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;

        let sched = JobScheduler::new().await?;

        let season_pass = Arc::clone(&self.season_pass);
        let running = Arc::clone(&self.running);
        let ttl_minutes = self.config.pending_order_ttl_minutes;

        let job = Job::new_async(self.config.expiry_sweep_cron.as_str(), move |_uuid, _lock| {
            let season_pass = Arc::clone(&season_pass);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "expire_orders", "Starting order expiry sweep");

                match sweep_once(season_pass.as_ref(), ttl_minutes).await {
                    Ok(count) => info!(
                        event = "job_finished",
                        job_name = "expire_orders",
                        expired = count,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Order expiry sweep finished"
                    ),
                    Err(e) => error!(event = "job_failed", job_name = "expire_orders", error = %e, "Order expiry sweep failed"),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        *self.sched.write().await = Some(sched);

        info!(
            "Order expiry sweep scheduled: {} (ttl {}m)",
            self.config.expiry_sweep_cron, ttl_minutes
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
        if let Some(mut sched) = self.sched.write().await.take() {
            sched.shutdown().await?;
        }
        Ok(())
    }

    pub async fn run_once(&self) -> Result<u64> {
        sweep_once(self.season_pass.as_ref(), self.config.pending_order_ttl_minutes).await
    }
}

/// Expires every pending order older than `ttl_minutes`.
pub async fn sweep_once(season_pass: &dyn SeasonPassService, ttl_minutes: u32) -> Result<u64> {
    let cutoff = Utc::now() - Duration::minutes(i64::from(ttl_minutes));
    Ok(season_pass.expire_stale_orders(cutoff).await?)
}
