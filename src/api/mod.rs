use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{AuthService, CatalogService, InvoiceGenerator, SeasonPassService};
use crate::state::SharedState;

mod admin;
pub mod auth;
mod error;
mod observability;
mod season_pass;
mod series;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn catalog_service(&self) -> &Arc<dyn CatalogService> {
        &self.shared.catalog_service
    }

    #[must_use]
    pub fn season_pass_service(&self) -> &Arc<dyn SeasonPassService> {
        &self.shared.season_pass_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Builds state around a caller-supplied invoice backend.
pub async fn create_app_state_with_invoices(
    config: Config,
    invoices: Arc<dyn InvoiceGenerator>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_invoice_generator(config, invoices).await?);
    Ok(create_app_state(shared, None))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_viewer_router(state.clone()))
        .merge(create_protected_router(state.clone()))
        .merge(create_admin_router(state.clone()))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(observability::get_health))
        .route("/metrics", get(observability::get_metrics))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/series", get(series::list_series))
        .route("/series/{id}", get(series::get_series))
        .route(
            "/season-pass/pricing/{series_id}",
            get(season_pass::get_pricing),
        )
        .route(
            "/season-pass/validate-coupon",
            post(season_pass::validate_coupon),
        )
        .route(
            "/season-pass/tranzila/success",
            post(season_pass::tranzila_success),
        )
        .route(
            "/season-pass/tranzila/fail",
            post(season_pass::tranzila_fail),
        )
        .route(
            "/season-pass/invoice/{order_id}",
            get(season_pass::get_invoice),
        )
}

/// Routes that personalize their answer when the caller is known.
fn create_viewer_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/season-pass/check-access/{series_id}",
            get(season_pass::check_access),
        )
        .route("/series/{id}/episodes", get(series::list_episodes))
        .route("/series/{id}/episodes/{number}", get(series::get_episode))
        .route_layer(middleware::from_fn_with_state(state, auth::optional_auth))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route(
            "/auth/api-key/regenerate",
            post(auth::regenerate_api_key),
        )
        .route(
            "/season-pass/create-order",
            post(season_pass::create_order),
        )
        .route("/season-pass/my-passes", get(season_pass::my_passes))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth))
}

fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/series", post(admin::create_series))
        .route("/admin/series/{id}/episodes", post(admin::add_episode))
        .route(
            "/admin/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth))
}
