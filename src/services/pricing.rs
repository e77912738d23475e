//! Coupon evaluation and discount arithmetic.
//!
//! Everything here is pure; callers load the series and coupon rows first.

use chrono::{DateTime, Utc};

use crate::domain::{Money, SeriesId};
use crate::models::coupon::Coupon;
use crate::services::season_pass_service::SeasonPassError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discount {
    pub base_price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
}

impl Discount {
    #[must_use]
    pub const fn none(base_price: Money) -> Self {
        Self {
            base_price,
            discount_amount: Money::ZERO,
            final_price: base_price,
        }
    }

    /// Never discounts below zero, so `final = base - discount` always holds.
    #[must_use]
    pub fn clamped(base_price: Money, raw_discount: Money) -> Self {
        let discount_amount = raw_discount.min(base_price).max(Money::ZERO);
        Self {
            base_price,
            discount_amount,
            final_price: base_price.saturating_sub(discount_amount),
        }
    }
}

/// Checks every coupon rule against `series_id` at `now`.
///
/// # Errors
///
/// Returns the first rule the coupon violates, checked in the order
/// active, validity window, usage cap, series scope.
pub fn evaluate_coupon(
    coupon: &Coupon,
    series_id: SeriesId,
    now: DateTime<Utc>,
) -> Result<(), SeasonPassError> {
    if !coupon.is_active {
        return Err(SeasonPassError::CouponInactive(coupon.code.clone()));
    }

    if coupon.valid_from.is_some_and(|from| now < from) {
        return Err(SeasonPassError::CouponNotYetValid(coupon.code.clone()));
    }

    if coupon.valid_until.is_some_and(|until| now > until) {
        return Err(SeasonPassError::CouponExpired(coupon.code.clone()));
    }

    if coupon.is_exhausted() {
        return Err(SeasonPassError::CouponExhausted(coupon.code.clone()));
    }

    if !coupon.applies_to(series_id) {
        return Err(SeasonPassError::CouponNotApplicable {
            code: coupon.code.clone(),
            series_id,
        });
    }

    Ok(())
}

/// Validates the coupon and applies it to `base_price`.
///
/// # Errors
///
/// See [`evaluate_coupon`].
pub fn apply_coupon(
    coupon: &Coupon,
    series_id: SeriesId,
    base_price: Money,
    now: DateTime<Utc>,
) -> Result<Discount, SeasonPassError> {
    evaluate_coupon(coupon, series_id, now)?;
    Ok(Discount::clamped(base_price, coupon.raw_discount(base_price)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DiscountType;
    use chrono::Duration;

    fn coupon(discount_type: DiscountType, value: f64) -> Coupon {
        Coupon {
            id: 1,
            code: "DRAMA20".to_string(),
            discount_type,
            discount_value: value,
            series_id: None,
            max_uses: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_coupon_matches_documented_example() {
        let c = coupon(DiscountType::Percentage, 20.0);
        let d = apply_coupon(&c, SeriesId::new(1), Money::from_major(99.90), Utc::now()).unwrap();

        assert_eq!(d.discount_amount, Money::from_minor(1998));
        assert_eq!(d.final_price, Money::from_minor(7992));
        assert_eq!(d.base_price.saturating_sub(d.discount_amount), d.final_price);
    }

    #[test]
    fn fixed_coupon_subtracts_value() {
        let c = coupon(DiscountType::Fixed, 15.0);
        let d = apply_coupon(&c, SeriesId::new(1), Money::from_major(99.90), Utc::now()).unwrap();

        assert_eq!(d.discount_amount, Money::from_minor(1500));
        assert_eq!(d.final_price, Money::from_minor(8490));
    }

    #[test]
    fn fixed_discount_larger_than_price_is_clamped() {
        let c = coupon(DiscountType::Fixed, 150.0);
        let d = apply_coupon(&c, SeriesId::new(1), Money::from_major(99.90), Utc::now()).unwrap();

        assert_eq!(d.discount_amount, Money::from_major(99.90));
        assert_eq!(d.final_price, Money::ZERO);
    }

    #[test]
    fn coupon_outside_window_is_rejected() {
        let now = Utc::now();

        let mut future = coupon(DiscountType::Percentage, 10.0);
        future.valid_from = Some(now + Duration::days(1));
        assert!(matches!(
            evaluate_coupon(&future, SeriesId::new(1), now),
            Err(SeasonPassError::CouponNotYetValid(_))
        ));

        let mut past = coupon(DiscountType::Percentage, 10.0);
        past.valid_from = Some(now - Duration::days(10));
        past.valid_until = Some(now - Duration::days(1));
        assert!(matches!(
            evaluate_coupon(&past, SeriesId::new(1), now),
            Err(SeasonPassError::CouponExpired(_))
        ));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.valid_from = Some(now);
        c.valid_until = Some(now);
        assert!(evaluate_coupon(&c, SeriesId::new(1), now).is_ok());
    }

    #[test]
    fn coupon_scoped_to_other_series_is_rejected() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.series_id = Some(SeriesId::new(1));

        assert!(evaluate_coupon(&c, SeriesId::new(1), Utc::now()).is_ok());
        assert!(matches!(
            evaluate_coupon(&c, SeriesId::new(2), Utc::now()),
            Err(SeasonPassError::CouponNotApplicable { .. })
        ));
    }

    #[test]
    fn inactive_and_exhausted_coupons_are_rejected() {
        let mut inactive = coupon(DiscountType::Fixed, 5.0);
        inactive.is_active = false;
        assert!(matches!(
            evaluate_coupon(&inactive, SeriesId::new(1), Utc::now()),
            Err(SeasonPassError::CouponInactive(_))
        ));

        let mut used_up = coupon(DiscountType::Fixed, 5.0);
        used_up.max_uses = Some(3);
        used_up.used_count = 3;
        assert!(matches!(
            evaluate_coupon(&used_up, SeriesId::new(1), Utc::now()),
            Err(SeasonPassError::CouponExhausted(_))
        ));
    }
}
