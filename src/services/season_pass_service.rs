//! Domain service for season pass pricing, orders and payment callbacks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::clients::tranzila::TranzilaCallback;
use crate::db::User;
use crate::domain::{Money, OrderStatus, SeriesId};

/// Errors specific to season pass operations.
#[derive(Debug, Error)]
pub enum SeasonPassError {
    #[error("Series not found: {0}")]
    SeriesNotFound(SeriesId),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon {0} is inactive")]
    CouponInactive(String),

    #[error("Coupon {0} is not valid yet")]
    CouponNotYetValid(String),

    #[error("Coupon {0} has expired")]
    CouponExpired(String),

    #[error("Coupon {0} reached its usage limit")]
    CouponExhausted(String),

    #[error("Coupon {code} does not apply to series {series_id}")]
    CouponNotApplicable { code: String, series_id: SeriesId },

    #[error("User already owns an active season pass for series {0}")]
    AlreadyOwned(SeriesId),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} cannot be activated from status {status}")]
    InvalidTransition {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Payment declined with response code {0}")]
    PaymentDeclined(String),

    #[error("Callback signature mismatch")]
    InvalidSignature,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SeasonPassError {
    /// Customer-facing message shown by the web client.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SeriesNotFound(_) => "הסדרה לא נמצאה".to_string(),
            Self::CouponNotFound(_) => "קופון לא נמצא".to_string(),
            Self::CouponInactive(_) => "הקופון אינו פעיל".to_string(),
            Self::CouponNotYetValid(_) => "הקופון עדיין לא בתוקף".to_string(),
            Self::CouponExpired(_) => "הקופון פג תוקף".to_string(),
            Self::CouponExhausted(_) => "הקופון הגיע למכסת השימושים".to_string(),
            Self::CouponNotApplicable { .. } => "הקופון אינו תקף לסדרה זו".to_string(),
            Self::AlreadyOwned(_) => "כבר רכשת מנוי עונתי לסדרה זו".to_string(),
            Self::OrderNotFound(_) => "ההזמנה לא נמצאה".to_string(),
            Self::InvalidTransition { .. } => "לא ניתן להפעיל את ההזמנה".to_string(),
            Self::PaymentDeclined(_) => "התשלום נדחה".to_string(),
            Self::InvalidSignature => "אימות התשלום נכשל".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "שגיאת שרת, נסו שוב מאוחר יותר".to_string(),
        }
    }

    /// Short machine-readable reason used in the payment failure redirect.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::PaymentDeclined(_) => "declined",
            Self::InvalidSignature => "invalid_signature",
            Self::OrderNotFound(_) => "order_not_found",
            Self::InvalidTransition { .. } => "invalid_status",
            Self::Validation(_) => "invalid_request",
            _ => "error",
        }
    }
}

impl From<sea_orm::DbErr> for SeasonPassError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SeasonPassError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Resolved price for one series, optionally after a coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub series_id: SeriesId,
    pub base_price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub currency: String,
    pub free_episodes_count: i32,
    pub total_episodes_count: i32,
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub series_id: SeriesId,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_id: String,
    pub payment_url: String,
    pub amount: Money,
    pub currency: String,
}

/// What a processed provider callback did to its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Activated { order_id: String },
    AlreadyActive { order_id: String },
    MarkedFailed { order_id: String },
    /// Fail callback for an order already past `pending`.
    Unchanged { order_id: String, status: OrderStatus },
}

impl CallbackOutcome {
    #[must_use]
    pub fn order_id(&self) -> &str {
        match self {
            Self::Activated { order_id }
            | Self::AlreadyActive { order_id }
            | Self::MarkedFailed { order_id }
            | Self::Unchanged { order_id, .. } => order_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatus {
    pub has_access: bool,
    pub purchase_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub id: SeriesId,
    pub title: String,
    pub poster_url: Option<String>,
    pub total_episodes: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub order_id: String,
    pub series_id: SeriesId,
    pub status: OrderStatus,
    pub price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub invoice_url: Option<String>,
    pub series: Option<SeriesSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInfo {
    pub invoice_url: Option<String>,
    pub invoice_number: Option<String>,
}

/// Domain service trait for the season pass purchase flow.
#[async_trait::async_trait]
pub trait SeasonPassService: Send + Sync {
    /// Base price of a series, with the coupon applied when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`SeasonPassError::SeriesNotFound`] or one of the coupon errors.
    async fn resolve_price(
        &self,
        series_id: SeriesId,
        coupon_code: Option<&str>,
    ) -> Result<PriceQuote, SeasonPassError>;

    /// Same as [`Self::resolve_price`] but a coupon is mandatory.
    async fn validate_coupon(
        &self,
        code: &str,
        series_id: SeriesId,
    ) -> Result<PriceQuote, SeasonPassError>;

    /// Persists a pending order and returns the hosted payment page link.
    async fn create_order(
        &self,
        user: &User,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, SeasonPassError>;

    async fn handle_payment_success(
        &self,
        callback: &TranzilaCallback,
    ) -> Result<CallbackOutcome, SeasonPassError>;

    async fn handle_payment_failure(
        &self,
        callback: &TranzilaCallback,
    ) -> Result<CallbackOutcome, SeasonPassError>;

    /// An anonymous viewer never has access.
    async fn check_access(
        &self,
        user: Option<&User>,
        series_id: SeriesId,
    ) -> Result<AccessStatus, SeasonPassError>;

    async fn my_passes(&self, user: &User) -> Result<Vec<PassSummary>, SeasonPassError>;

    async fn get_invoice(&self, order_id: &str) -> Result<InvoiceInfo, SeasonPassError>;

    /// Expires pending orders created before `older_than` and returns how many moved.
    async fn expire_stale_orders(&self, older_than: DateTime<Utc>)
    -> Result<u64, SeasonPassError>;
}
