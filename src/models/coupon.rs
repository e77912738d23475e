use chrono::{DateTime, Utc};

use crate::domain::{DiscountType, Money, SeriesId};

#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub series_id: Option<SeriesId>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Raw discount this coupon grants on `price`, before clamping.
    #[must_use]
    pub fn raw_discount(&self, price: Money) -> Money {
        match self.discount_type {
            DiscountType::Percentage => price.percent(self.discount_value),
            DiscountType::Fixed => Money::from_major(self.discount_value),
        }
    }

    #[must_use]
    pub fn applies_to(&self, series_id: SeriesId) -> bool {
        self.series_id.is_none_or(|scoped| scoped == series_id)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }
}

#[derive(Debug, Clone)]
pub struct CouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub series_id: Option<SeriesId>,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Canonical form used for storage and lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
