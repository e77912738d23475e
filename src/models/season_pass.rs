use chrono::{DateTime, Utc};

use crate::domain::{Money, OrderId, OrderStatus, SeriesId, UserId};

/// A season pass order row.
#[derive(Debug, Clone)]
pub struct SeasonPass {
    pub id: i32,
    pub order_id: String,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub status: OrderStatus,
    pub price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub transaction_id: Option<String>,
    pub invoice_url: Option<String>,
    pub invoice_number: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSeasonPass {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
}
