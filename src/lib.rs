pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use scheduler::Scheduler;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command(), Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists, leaving it untouched.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    match cli.command() {
        Commands::Serve => run_daemon(config, prometheus_handle).await,
        Commands::Sweep => run_single_sweep(config).await,
        Commands::CheckConfig => {
            print_config_summary(&config);
            Ok(())
        }
        Commands::Init => Ok(()),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "SeasonPass v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let port = config.server.port;
    let sweep_config = config.season_pass.clone();

    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(api_state.season_pass_service()),
        sweep_config,
    ));
    if let Err(e) = scheduler.start().await {
        error!("Scheduler error: {}", e);
    }

    info!("Starting Web API on port {}", port);

    let app = api::router(api_state).await;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let server_handle = tokio::spawn(async move {
        info!("Web Server running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    if let Err(e) = scheduler.stop().await {
        error!("Failed to stop scheduler: {}", e);
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_single_sweep(config: Config) -> anyhow::Result<()> {
    info!("Running single order expiry sweep...");

    let sweep_config = config.season_pass.clone();
    let state = SharedState::new(config).await?;
    let scheduler = Scheduler::new(state.season_pass_service, sweep_config);
    let expired = scheduler.run_once().await?;

    println!("Expired {expired} stale pending order(s)");
    Ok(())
}

fn print_config_summary(config: &Config) {
    println!("Configuration OK");
    println!();
    println!("  Database:        {}", config.general.database_path);
    println!("  Port:            {}", config.server.port);
    println!("  Frontend URL:    {}", config.server.frontend_url);
    println!("  Public API URL:  {}", config.server.public_api_url);
    println!(
        "  Default price:   {:.2} {}",
        config.season_pass.default_price, config.season_pass.currency
    );
    println!(
        "  Order TTL:       {} minutes",
        config.season_pass.pending_order_ttl_minutes
    );
    println!("  Tranzila:        {}", config.tranzila.terminal_name);
    println!(
        "  Admin:           {}",
        if config.security.admin_email.is_empty() {
            "not configured"
        } else {
            config.security.admin_email.as_str()
        }
    );
    println!(
        "  Green Invoice:   {}",
        if config.green_invoice.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Metrics:         {}",
        if config.observability.metrics_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
}
