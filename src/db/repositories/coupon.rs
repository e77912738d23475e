use crate::domain::{DiscountType, SeriesId};
use crate::entities::{coupons, prelude::*};
use crate::models::coupon::{Coupon, CouponInput, normalize_code};
use anyhow::{Context, Result};
use sea_orm::sea_query::{Condition, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, warn};

/// Repository for coupon lookup and usage accounting
pub struct CouponRepository {
    conn: DatabaseConnection,
}

impl CouponRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: coupons::Model) -> Coupon {
        let discount_type = m.discount_type.parse().unwrap_or_else(|e| {
            warn!("Coupon {} has {e}; treating as fixed", m.code);
            DiscountType::Fixed
        });

        Coupon {
            id: m.id,
            code: m.code,
            discount_type,
            discount_value: m.discount_value,
            series_id: m.series_id.map(SeriesId::new),
            max_uses: m.max_uses,
            used_count: m.used_count,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let row = Coupons::find()
            .filter(coupons::Column::Code.eq(normalize_code(code)))
            .one(&self.conn)
            .await
            .context("Failed to query coupon by code")?;

        Ok(row.map(Self::map_model))
    }

    pub async fn list_all(&self) -> Result<Vec<Coupon>> {
        let rows = Coupons::find()
            .order_by_desc(coupons::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list coupons")?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn create(&self, input: &CouponInput) -> Result<Coupon> {
        let active = coupons::ActiveModel {
            code: Set(normalize_code(&input.code)),
            discount_type: Set(input.discount_type.as_str().to_string()),
            discount_value: Set(input.discount_value),
            series_id: Set(input.series_id.map(|id| id.value())),
            max_uses: Set(input.max_uses),
            used_count: Set(0),
            valid_from: Set(input.valid_from),
            valid_until: Set(input.valid_until),
            is_active: Set(input.is_active),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert coupon")?;
        info!("Created coupon {}", model.code);

        Ok(Self::map_model(model))
    }

    /// Claims one use of the coupon in a single guarded UPDATE.
    ///
    /// Returns `false` when the coupon is inactive or its cap is reached, so
    /// two concurrent redemptions of the last use cannot both succeed.
    pub async fn reserve_use(&self, code: &str) -> Result<bool> {
        let result = Coupons::update_many()
            .col_expr(
                coupons::Column::UsedCount,
                Expr::col(coupons::Column::UsedCount).add(1),
            )
            .filter(coupons::Column::Code.eq(normalize_code(code)))
            .filter(coupons::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(coupons::Column::MaxUses.is_null())
                    .add(Expr::col(coupons::Column::UsedCount).lt(Expr::col(coupons::Column::MaxUses))),
            )
            .exec(&self.conn)
            .await
            .context("Failed to reserve coupon use")?;

        Ok(result.rows_affected > 0)
    }

    /// Gives back a use claimed by [`Self::reserve_use`].
    pub async fn release_use(&self, code: &str) -> Result<bool> {
        let result = Coupons::update_many()
            .col_expr(
                coupons::Column::UsedCount,
                Expr::col(coupons::Column::UsedCount).sub(1),
            )
            .filter(coupons::Column::Code.eq(normalize_code(code)))
            .filter(coupons::Column::UsedCount.gt(0))
            .exec(&self.conn)
            .await
            .context("Failed to release coupon use")?;

        Ok(result.rows_affected > 0)
    }
}
