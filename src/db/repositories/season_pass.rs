use crate::domain::{Money, OrderStatus, SeriesId, UserId};
use crate::entities::{prelude::*, season_passes};
use crate::models::season_pass::{NewSeasonPass, SeasonPass};
use crate::models::series::Series as SeriesRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, warn};

use super::series::SeriesRepository;

/// Repository for season pass orders
pub struct SeasonPassRepository {
    conn: DatabaseConnection,
}

impl SeasonPassRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Model Conversion Helpers
    // ========================================================================

    fn map_model(m: season_passes::Model) -> SeasonPass {
        let status = m.status.parse().unwrap_or_else(|e| {
            warn!("Order {} has {e}; treating as failed", m.order_id);
            OrderStatus::Failed
        });

        SeasonPass {
            id: m.id,
            order_id: m.order_id,
            user_id: UserId::new(m.user_id),
            series_id: SeriesId::new(m.series_id),
            status,
            price: Money::from_minor(m.price),
            discount_amount: Money::from_minor(m.discount_amount),
            final_price: Money::from_minor(m.final_price),
            currency: m.currency,
            coupon_code: m.coupon_code,
            customer_email: m.customer_email,
            customer_name: m.customer_name,
            customer_phone: m.customer_phone,
            transaction_id: m.transaction_id,
            invoice_url: m.invoice_url,
            invoice_number: m.invoice_number,
            purchased_at: m.purchased_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }

    // ========================================================================
    // Order Operations
    // ========================================================================

    pub async fn insert(&self, order: &NewSeasonPass) -> Result<SeasonPass> {
        let now = Utc::now();
        let active = season_passes::ActiveModel {
            order_id: Set(order.order_id.as_str().to_string()),
            user_id: Set(order.user_id.value()),
            series_id: Set(order.series_id.value()),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            price: Set(order.price.minor()),
            discount_amount: Set(order.discount_amount.minor()),
            final_price: Set(order.final_price.minor()),
            currency: Set(order.currency.clone()),
            coupon_code: Set(order.coupon_code.clone()),
            customer_email: Set(order.customer_email.clone()),
            customer_name: Set(order.customer_name.clone()),
            customer_phone: Set(order.customer_phone.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert season pass order")?;
        info!(
            "Created pending order {} for user {} series {}",
            model.order_id, model.user_id, model.series_id
        );

        Ok(Self::map_model(model))
    }

    pub async fn get_by_order_id(&self, order_id: &str) -> Result<Option<SeasonPass>> {
        let row = SeasonPasses::find()
            .filter(season_passes::Column::OrderId.eq(order_id))
            .one(&self.conn)
            .await
            .context("Failed to query order by id")?;

        Ok(row.map(Self::map_model))
    }

    /// Moves an order from `from` to `active`.
    ///
    /// Returns `false` when the order is no longer in `from`.
    pub async fn activate(
        &self,
        order_id: &str,
        from: OrderStatus,
        transaction_id: Option<&str>,
        purchased_at: DateTime<Utc>,
    ) -> Result<bool> {
        anyhow::ensure!(from.can_activate(), "Cannot activate an order from {from}");

        let result = SeasonPasses::update_many()
            .col_expr(
                season_passes::Column::Status,
                Expr::value(OrderStatus::Active.as_str()),
            )
            .col_expr(
                season_passes::Column::TransactionId,
                Expr::value(transaction_id.map(str::to_string)),
            )
            .col_expr(season_passes::Column::PurchasedAt, Expr::value(purchased_at))
            .col_expr(season_passes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(season_passes::Column::OrderId.eq(order_id))
            .filter(season_passes::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to activate order")?;

        Ok(result.rows_affected > 0)
    }

    /// Guarded `from -> to` status transition.
    pub async fn transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let result = SeasonPasses::update_many()
            .col_expr(season_passes::Column::Status, Expr::value(to.as_str()))
            .col_expr(season_passes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(season_passes::Column::OrderId.eq(order_id))
            .filter(season_passes::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update order status")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_invoice(
        &self,
        order_id: &str,
        invoice_url: Option<&str>,
        invoice_number: &str,
    ) -> Result<()> {
        let row = SeasonPasses::find()
            .filter(season_passes::Column::OrderId.eq(order_id))
            .one(&self.conn)
            .await
            .context("Failed to query order for invoice update")?
            .ok_or_else(|| anyhow::anyhow!("Order not found: {order_id}"))?;

        let mut active: season_passes::ActiveModel = row.into();
        active.invoice_url = Set(invoice_url.map(str::to_string));
        active.invoice_number = Set(Some(invoice_number.to_string()));
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn find_active(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<SeasonPass>> {
        let row = SeasonPasses::find()
            .filter(season_passes::Column::UserId.eq(user_id.value()))
            .filter(season_passes::Column::SeriesId.eq(series_id.value()))
            .filter(season_passes::Column::Status.eq(OrderStatus::Active.as_str()))
            .order_by_asc(season_passes::Column::PurchasedAt)
            .one(&self.conn)
            .await
            .context("Failed to query active season pass")?;

        Ok(row.map(Self::map_model))
    }

    pub async fn list_active_with_series(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(SeasonPass, Option<SeriesRecord>)>> {
        let rows = SeasonPasses::find()
            .filter(season_passes::Column::UserId.eq(user_id.value()))
            .filter(season_passes::Column::Status.eq(OrderStatus::Active.as_str()))
            .order_by_desc(season_passes::Column::PurchasedAt)
            .find_also_related(Series)
            .all(&self.conn)
            .await
            .context("Failed to list season passes")?;

        Ok(rows
            .into_iter()
            .map(|(pass, series)| {
                (
                    Self::map_model(pass),
                    series.map(SeriesRepository::map_series_model),
                )
            })
            .collect())
    }

    pub async fn list_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<SeasonPass>> {
        let rows = SeasonPasses::find()
            .filter(season_passes::Column::Status.eq(OrderStatus::Pending.as_str()))
            .filter(season_passes::Column::CreatedAt.lt(cutoff))
            .order_by_asc(season_passes::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list stale pending orders")?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }
}
