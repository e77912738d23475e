use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use super::auth::CurrentUser;
use super::validation::{validate_order_id, validate_series_id};
use super::{ApiError, ApiResponse, AppState};
use crate::clients::tranzila::TranzilaCallback;
use crate::services::{
    AccessStatus, CreateOrderRequest, CreatedOrder, InvoiceInfo, PassSummary, PriceQuote,
    SeasonPassError,
};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingQuery {
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponBody {
    pub code: String,
    pub series_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub series_id: i32,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub coupon_code: Option<String>,
}

impl From<SeasonPassError> for ApiError {
    fn from(err: SeasonPassError) -> Self {
        let message = err.user_message();
        match err {
            SeasonPassError::SeriesNotFound(_)
            | SeasonPassError::CouponNotFound(_)
            | SeasonPassError::OrderNotFound(_) => Self::NotFound(message),
            SeasonPassError::CouponInactive(_)
            | SeasonPassError::CouponNotYetValid(_)
            | SeasonPassError::CouponExpired(_)
            | SeasonPassError::CouponExhausted(_)
            | SeasonPassError::CouponNotApplicable { .. }
            | SeasonPassError::PaymentDeclined(_)
            | SeasonPassError::InvalidSignature
            | SeasonPassError::Validation(_) => Self::ValidationError(message),
            SeasonPassError::AlreadyOwned(_) | SeasonPassError::InvalidTransition { .. } => {
                Self::Conflict(message)
            }
            SeasonPassError::Database(msg) => Self::DatabaseError(msg),
            SeasonPassError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

// ============================================================================
// Pricing & Orders
// ============================================================================

/// GET /season-pass/pricing/{seriesId}
pub async fn get_pricing(
    State(state): State<Arc<AppState>>,
    Path(series_id): Path<i32>,
    Query(query): Query<PricingQuery>,
) -> Result<Json<ApiResponse<PriceQuote>>, ApiError> {
    let series_id = validate_series_id(series_id)?;
    let quote = state
        .season_pass_service()
        .resolve_price(series_id, query.coupon_code.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(quote)))
}

/// POST /season-pass/validate-coupon
pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ValidateCouponBody>,
) -> Result<Json<ApiResponse<PriceQuote>>, ApiError> {
    let series_id = validate_series_id(body.series_id)?;
    let quote = state
        .season_pass_service()
        .validate_coupon(&body.code, series_id)
        .await?;

    Ok(Json(ApiResponse::success(quote)))
}

/// POST /season-pass/create-order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedOrder>>), ApiError> {
    let request = CreateOrderRequest {
        series_id: validate_series_id(body.series_id)?,
        customer_email: body.customer_email,
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        coupon_code: body.coupon_code,
    };

    let order = state
        .season_pass_service()
        .create_order(&user, request)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

// ============================================================================
// Payment Provider Callbacks
// ============================================================================

/// POST /season-pass/tranzila/success
/// Always answers with a redirect to the frontend
pub async fn tranzila_success(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TranzilaCallback>, FormRejection>,
) -> Response {
    let frontend_url = state.config().read().await.server.frontend_url.clone();

    let Ok(Form(callback)) = form else {
        warn!("Malformed success callback body");
        return fail_redirect(&frontend_url, None, "invalid_request");
    };

    match state
        .season_pass_service()
        .handle_payment_success(&callback)
        .await
    {
        Ok(outcome) => {
            info!(order_id = outcome.order_id(), ?outcome, "Success callback processed");
            success_redirect(&frontend_url, outcome.order_id())
        }
        Err(e) => {
            log_callback_error(&callback, &e);
            fail_redirect(&frontend_url, Some(&callback.order_id), e.reason())
        }
    }
}

/// POST /season-pass/tranzila/fail
pub async fn tranzila_fail(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TranzilaCallback>, FormRejection>,
) -> Response {
    let frontend_url = state.config().read().await.server.frontend_url.clone();

    let Ok(Form(callback)) = form else {
        warn!("Malformed fail callback body");
        return fail_redirect(&frontend_url, None, "invalid_request");
    };

    match state
        .season_pass_service()
        .handle_payment_failure(&callback)
        .await
    {
        Ok(outcome) => {
            info!(order_id = outcome.order_id(), ?outcome, "Fail callback processed");
            fail_redirect(&frontend_url, Some(outcome.order_id()), "declined")
        }
        Err(e) => {
            log_callback_error(&callback, &e);
            fail_redirect(&frontend_url, Some(&callback.order_id), e.reason())
        }
    }
}

fn log_callback_error(callback: &TranzilaCallback, err: &SeasonPassError) {
    match err {
        SeasonPassError::Database(_) | SeasonPassError::Internal(_) => {
            error!(order_id = %callback.order_id, error = %err, "Payment callback failed");
        }
        _ => warn!(order_id = %callback.order_id, error = %err, "Payment callback rejected"),
    }
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn frontend_page(frontend_url: &str, page: &str, params: &[(&str, &str)]) -> String {
    let base = format!("{}/payment/{page}", frontend_url.trim_end_matches('/'));
    Url::parse_with_params(&base, params).map_or(base, |url| url.to_string())
}

fn success_redirect(frontend_url: &str, order_id: &str) -> Response {
    redirect(&frontend_page(
        frontend_url,
        "success",
        &[("orderId", order_id)],
    ))
}

fn fail_redirect(frontend_url: &str, order_id: Option<&str>, reason: &str) -> Response {
    let mut params = Vec::with_capacity(2);
    if let Some(id) = order_id.filter(|id| !id.is_empty()) {
        params.push(("orderId", id));
    }
    params.push(("reason", reason));

    redirect(&frontend_page(frontend_url, "fail", &params))
}

// ============================================================================
// Access & Purchases
// ============================================================================

/// GET /season-pass/check-access/{seriesId}
/// Anonymous callers get `hasAccess: false`
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Path(series_id): Path<i32>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<ApiResponse<AccessStatus>>, ApiError> {
    let series_id = validate_series_id(series_id)?;
    let user = user.map(|Extension(CurrentUser(u))| u);

    let status = state
        .season_pass_service()
        .check_access(user.as_ref(), series_id)
        .await?;

    Ok(Json(ApiResponse::success(status)))
}

/// GET /season-pass/my-passes
pub async fn my_passes(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<PassSummary>>>, ApiError> {
    let passes = state.season_pass_service().my_passes(&user).await?;
    Ok(Json(ApiResponse::success(passes)))
}

/// GET /season-pass/invoice/{orderId}
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<InvoiceInfo>>, ApiError> {
    let order_id = validate_order_id(&order_id)?;
    let invoice = state
        .season_pass_service()
        .get_invoice(order_id.as_str())
        .await?;

    Ok(Json(ApiResponse::success(invoice)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_redirect_encodes_params() {
        let page = frontend_page(
            "https://drama.example/",
            "fail",
            &[("orderId", "ORD-1-deadbeef"), ("reason", "declined")],
        );
        assert_eq!(
            page,
            "https://drama.example/payment/fail?orderId=ORD-1-deadbeef&reason=declined"
        );
    }

    #[test]
    fn redirect_is_302_with_location() {
        let response = success_redirect("https://drama.example", "ORD-1-deadbeef");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://drama.example/payment/success?orderId=ORD-1-deadbeef"
        );
    }
}
