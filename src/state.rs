use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clients::green_invoice::GreenInvoiceClient;
use crate::clients::tranzila::TranzilaClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, CatalogService, DisabledInvoiceGenerator, InvoiceGenerator, SeaOrmAuthService,
    SeaOrmCatalogService, SeaOrmSeasonPassService, SeasonPassService,
};

/// Build a shared HTTP client for outbound provider calls.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("SeasonPass/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tranzila: Arc<TranzilaClient>,

    pub auth_service: Arc<dyn AuthService>,

    pub catalog_service: Arc<dyn CatalogService>,

    pub season_pass_service: Arc<dyn SeasonPassService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let invoices: Arc<dyn InvoiceGenerator> = if config.green_invoice.enabled {
            let http_client =
                build_shared_http_client(config.green_invoice.request_timeout_seconds.into())?;
            Arc::new(GreenInvoiceClient::with_shared_client(
                http_client,
                config.green_invoice.clone(),
            ))
        } else {
            Arc::new(DisabledInvoiceGenerator)
        };

        Self::with_invoice_generator(config, invoices).await
    }

    /// Same as [`Self::new`] with a caller-supplied invoice backend.
    pub async fn with_invoice_generator(
        config: Config,
        invoices: Arc<dyn InvoiceGenerator>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let security = &config.security;
        if security.admin_email.is_empty() {
            warn!("No admin configured (security.admin_email / ADMIN_EMAIL); catalog management is unavailable");
        } else {
            let admin = store
                .ensure_admin(&security.admin_email, &security.admin_password, security)
                .await?;
            info!(user_id = %admin.id, email = %admin.email, "Admin account ready");
        }

        let tranzila = Arc::new(TranzilaClient::new(
            config.tranzila.clone(),
            &config.server.public_api_url,
        ));

        let config = Arc::new(RwLock::new(config));

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), config.clone()))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let catalog_service = Arc::new(SeaOrmCatalogService::new(store.clone(), config.clone()))
            as Arc<dyn CatalogService + Send + Sync + 'static>;

        let season_pass_service = Arc::new(SeaOrmSeasonPassService::new(
            store.clone(),
            config.clone(),
            tranzila.clone(),
            invoices,
        )) as Arc<dyn SeasonPassService + Send + Sync + 'static>;

        Ok(Self {
            config,
            store,
            tranzila,
            auth_service,
            catalog_service,
            season_pass_service,
        })
    }
}
