use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub season_pass: SeasonPassConfig,

    pub tranzila: TranzilaConfig,

    pub green_invoice: GreenInvoiceConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/seasonpass.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Base URL of the web frontend; payment redirects land here.
    pub frontend_url: String,

    /// Externally reachable base URL of this API, used for provider notify URLs.
    pub public_api_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            frontend_url: "http://localhost:3000".to_string(),
            public_api_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonPassConfig {
    /// Price used when a series has no season pass price set (ILS)
    pub default_price: f64,

    pub currency: String,

    /// Pending orders older than this are expired by the sweep
    pub pending_order_ttl_minutes: u32,

    pub expiry_sweep_enabled: bool,

    pub expiry_sweep_cron: String,
}

impl Default for SeasonPassConfig {
    fn default() -> Self {
        Self {
            default_price: 99.90,
            currency: "ILS".to_string(),
            pending_order_ttl_minutes: 60,
            expiry_sweep_enabled: true,
            expiry_sweep_cron: "0 */5 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranzilaConfig {
    pub base_url: String,

    pub terminal_name: String,

    /// Tranzila currency code (1 = ILS)
    pub currency_code: u8,

    /// Language of the hosted payment page
    pub lang: String,

    /// Key for the HMAC carried in the callback custom fields
    #[serde(skip_serializing)]
    pub callback_secret: String,

    pub product_description: String,
}

impl Default for TranzilaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://direct.tranzila.com".to_string(),
            terminal_name: "change-me".to_string(),
            currency_code: 1,
            lang: "il".to_string(),
            callback_secret: String::new(),
            product_description: "Season Pass".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenInvoiceConfig {
    pub enabled: bool,

    pub api_url: String,

    pub api_key_id: String,

    #[serde(skip_serializing)]
    pub api_secret: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for GreenInvoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.greeninvoice.co.il/api/v1".to_string(),
            api_key_id: String::new(),
            api_secret: String::new(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "seasonpass".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    /// Admin ensured at startup; empty disables the bootstrap
    pub admin_email: String,

    /// Only used when the admin account is first created
    #[serde(skip_serializing)]
    pub admin_password: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            admin_email: String::new(),
            admin_password: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            season_pass: SeasonPassConfig::default(),
            tranzila: TranzilaConfig::default(),
            green_invoice: GreenInvoiceConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Loads `.env`, then the first config file found, then environment overrides.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from: {}", path.display());
        }

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies process environment on top of file values.
    ///
    /// `lookup` is injected so tests do not touch the real environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };

        set(&mut self.general.database_path, "DATABASE_URL");
        set(&mut self.general.log_level, "LOG_LEVEL");
        set(&mut self.server.frontend_url, "FRONTEND_URL");
        set(&mut self.server.public_api_url, "PUBLIC_API_URL");
        set(&mut self.tranzila.terminal_name, "TRANZILA_TERMINAL");
        set(&mut self.tranzila.callback_secret, "TRANZILA_CALLBACK_SECRET");
        set(&mut self.green_invoice.api_url, "GREEN_INVOICE_API_URL");
        set(&mut self.green_invoice.api_key_id, "GREEN_INVOICE_API_KEY");
        set(&mut self.green_invoice.api_secret, "GREEN_INVOICE_API_SECRET");
        set(&mut self.security.admin_email, "ADMIN_EMAIL");
        set(&mut self.security.admin_password, "ADMIN_PASSWORD");

        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if !self.green_invoice.api_key_id.is_empty() && !self.green_invoice.api_secret.is_empty()
        {
            self.green_invoice.enabled = true;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("seasonpass").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tranzila.callback_secret.is_empty() {
            anyhow::bail!(
                "tranzila.callback_secret must be set (or TRANZILA_CALLBACK_SECRET) to verify payment callbacks"
            );
        }

        if self.tranzila.terminal_name.is_empty() {
            anyhow::bail!("tranzila.terminal_name cannot be empty");
        }

        if self.server.frontend_url.is_empty() {
            anyhow::bail!("server.frontend_url cannot be empty");
        }

        url::Url::parse(&self.server.frontend_url).context("server.frontend_url is not a URL")?;

        if self.season_pass.default_price <= 0.0 {
            anyhow::bail!("season_pass.default_price must be > 0");
        }

        if self.season_pass.pending_order_ttl_minutes == 0 {
            anyhow::bail!("season_pass.pending_order_ttl_minutes must be > 0");
        }

        if self.green_invoice.enabled
            && (self.green_invoice.api_key_id.is_empty() || self.green_invoice.api_secret.is_empty())
        {
            anyhow::bail!("green_invoice is enabled but api_key_id/api_secret are missing");
        }

        if !self.security.admin_email.is_empty()
            && self.security.admin_password.chars().count() < self.security.min_password_length
        {
            anyhow::bail!(
                "security.admin_password (or ADMIN_PASSWORD) must be at least {} characters",
                self.security.min_password_length
            );
        }

        Ok(())
    }
}
