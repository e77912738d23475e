//! `SeaORM` implementation of the `SeasonPassService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clients::tranzila::{PaymentRequest, TranzilaCallback, TranzilaClient};
use crate::config::Config;
use crate::db::{Store, User};
use crate::domain::{Money, OrderId, OrderStatus, SeriesId};
use crate::models::coupon::normalize_code;
use crate::models::season_pass::{NewSeasonPass, SeasonPass};
use crate::services::invoice_service::{InvoiceError, InvoiceGenerator, InvoiceRequest};
use crate::services::pricing::{Discount, apply_coupon};
use crate::services::season_pass_service::{
    AccessStatus, CallbackOutcome, CreateOrderRequest, CreatedOrder, InvoiceInfo, PassSummary,
    PriceQuote, SeasonPassError, SeasonPassService, SeriesSummary,
};

fn record_order_outcome(outcome: &'static str) {
    metrics::counter!("season_pass_orders_total", "outcome" => outcome).increment(1);
}

pub struct SeaOrmSeasonPassService {
    store: Store,
    config: Arc<RwLock<Config>>,
    tranzila: Arc<TranzilaClient>,
    invoices: Arc<dyn InvoiceGenerator>,
}

impl SeaOrmSeasonPassService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        tranzila: Arc<TranzilaClient>,
        invoices: Arc<dyn InvoiceGenerator>,
    ) -> Self {
        Self {
            store,
            config,
            tranzila,
            invoices,
        }
    }

    async fn product_description(&self, series_title: Option<&str>) -> String {
        let base = self.config.read().await.tranzila.product_description.clone();
        match series_title {
            Some(title) => format!("{base} - {title}"),
            None => base,
        }
    }

    /// Checks the signature and loads the order the callback refers to.
    async fn load_callback_order(
        &self,
        callback: &TranzilaCallback,
    ) -> Result<SeasonPass, SeasonPassError> {
        if !self.tranzila.verify_callback(callback) {
            warn!(order_id = %callback.order_id, "Rejected unsigned or tampered payment callback");
            return Err(SeasonPassError::InvalidSignature);
        }

        let order = self
            .store
            .get_order(&callback.order_id)
            .await?
            .ok_or_else(|| SeasonPassError::OrderNotFound(callback.order_id.clone()))?;

        if order.user_id.to_string() != callback.user_id
            || order.series_id.to_string() != callback.series_id
        {
            return Err(SeasonPassError::Validation(format!(
                "Callback metadata does not match order {}",
                order.order_id
            )));
        }

        Ok(order)
    }

    async fn release_coupon(&self, order: &SeasonPass) {
        let Some(code) = order.coupon_code.as_deref() else {
            return;
        };

        match self.store.release_coupon_use(code).await {
            Ok(true) => debug!(order_id = %order.order_id, coupon = code, "Released coupon use"),
            Ok(false) => warn!(order_id = %order.order_id, coupon = code, "Coupon had no use to release"),
            Err(e) => warn!(order_id = %order.order_id, coupon = code, error = %e, "Failed to release coupon use"),
        }
    }

    /// Best effort: the order stays active when invoicing fails.
    async fn issue_invoice(
        &self,
        order: &SeasonPass,
        transaction_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) {
        let series_title = match self.store.get_series(order.series_id).await {
            Ok(series) => series.map(|s| s.title),
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "Failed to load series for invoice");
                None
            }
        };

        let request = InvoiceRequest {
            order_id: order.order_id.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            description: self.product_description(series_title.as_deref()).await,
            amount: order.final_price,
            currency: order.currency.clone(),
            transaction_id: transaction_id.map(str::to_string),
            paid_at,
        };

        match self.invoices.generate(&request).await {
            Ok(invoice) => {
                if let Err(e) = self
                    .store
                    .set_order_invoice(&order.order_id, invoice.url.as_deref(), &invoice.number)
                    .await
                {
                    warn!(order_id = %order.order_id, error = %e, "Failed to store invoice metadata");
                }
            }
            Err(InvoiceError::Disabled) => {
                debug!(order_id = %order.order_id, "Invoicing disabled, skipping");
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "Invoice generation failed");
            }
        }
    }
}

#[async_trait]
impl SeasonPassService for SeaOrmSeasonPassService {
    async fn resolve_price(
        &self,
        series_id: SeriesId,
        coupon_code: Option<&str>,
    ) -> Result<PriceQuote, SeasonPassError> {
        let series = self
            .store
            .get_series(series_id)
            .await?
            .ok_or(SeasonPassError::SeriesNotFound(series_id))?;

        let (default_price, currency) = {
            let config = self.config.read().await;
            (
                Money::from_major(config.season_pass.default_price),
                config.season_pass.currency.clone(),
            )
        };
        let base_price = series.season_pass_price.unwrap_or(default_price);

        let code = coupon_code.map(normalize_code).filter(|c| !c.is_empty());
        let discount = match &code {
            Some(code) => {
                let coupon = self
                    .store
                    .get_coupon(code)
                    .await?
                    .ok_or_else(|| SeasonPassError::CouponNotFound(code.clone()))?;
                apply_coupon(&coupon, series_id, base_price, Utc::now())?
            }
            None => Discount::none(base_price),
        };

        Ok(PriceQuote {
            series_id,
            base_price: discount.base_price,
            discount_amount: discount.discount_amount,
            final_price: discount.final_price,
            coupon_code: code,
            currency,
            free_episodes_count: series.free_episodes_count,
            total_episodes_count: series.total_episodes,
        })
    }

    async fn validate_coupon(
        &self,
        code: &str,
        series_id: SeriesId,
    ) -> Result<PriceQuote, SeasonPassError> {
        if code.trim().is_empty() {
            return Err(SeasonPassError::Validation("יש להזין קוד קופון".to_string()));
        }
        self.resolve_price(series_id, Some(code)).await
    }

    async fn create_order(
        &self,
        user: &User,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, SeasonPassError> {
        let customer_email = request.customer_email.trim().to_string();
        let customer_name = request.customer_name.trim().to_string();
        let customer_phone = request
            .customer_phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if !customer_email.contains('@') {
            return Err(SeasonPassError::Validation("כתובת אימייל לא תקינה".to_string()));
        }
        if customer_name.is_empty() {
            return Err(SeasonPassError::Validation("יש להזין שם מלא".to_string()));
        }

        let quote = self
            .resolve_price(request.series_id, request.coupon_code.as_deref())
            .await?;

        if self
            .store
            .find_active_pass(user.id, quote.series_id)
            .await?
            .is_some()
        {
            return Err(SeasonPassError::AlreadyOwned(quote.series_id));
        }

        if let Some(code) = &quote.coupon_code
            && !self.store.reserve_coupon_use(code).await?
        {
            return Err(SeasonPassError::CouponExhausted(code.clone()));
        }

        let new_order = NewSeasonPass {
            order_id: OrderId::generate(),
            user_id: user.id,
            series_id: quote.series_id,
            price: quote.base_price,
            discount_amount: quote.discount_amount,
            final_price: quote.final_price,
            currency: quote.currency.clone(),
            coupon_code: quote.coupon_code.clone(),
            customer_email,
            customer_name,
            customer_phone,
        };

        let order = match self.store.insert_order(&new_order).await {
            Ok(order) => order,
            Err(e) => {
                if let Some(code) = &new_order.coupon_code
                    && let Err(release_err) = self.store.release_coupon_use(code).await
                {
                    warn!(coupon = %code, error = %release_err, "Failed to release coupon after insert error");
                }
                return Err(e.into());
            }
        };

        let series_title = self.store.get_series(order.series_id).await?.map(|s| s.title);
        let description = self.product_description(series_title.as_deref()).await;

        let payment_url = self.tranzila.payment_url(&PaymentRequest {
            order_id: &order.order_id,
            user_id: order.user_id,
            series_id: order.series_id,
            amount: order.final_price,
            customer_name: &order.customer_name,
            customer_email: &order.customer_email,
            customer_phone: order.customer_phone.as_deref(),
            description: &description,
        })?;

        record_order_outcome("created");
        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            series_id = %order.series_id,
            amount = %order.final_price,
            "Season pass order created"
        );

        Ok(CreatedOrder {
            order_id: order.order_id,
            payment_url: payment_url.to_string(),
            amount: order.final_price,
            currency: order.currency,
        })
    }

    async fn handle_payment_success(
        &self,
        callback: &TranzilaCallback,
    ) -> Result<CallbackOutcome, SeasonPassError> {
        if !callback.is_approved() {
            info!(order_id = %callback.order_id, response = %callback.response, "Payment not approved");
            return Err(SeasonPassError::PaymentDeclined(callback.response.clone()));
        }

        let order = self.load_callback_order(callback).await?;

        if order.status == OrderStatus::Active {
            debug!(order_id = %order.order_id, "Duplicate success callback ignored");
            return Ok(CallbackOutcome::AlreadyActive {
                order_id: order.order_id,
            });
        }

        if order.status.is_terminal() {
            return Err(SeasonPassError::InvalidTransition {
                order_id: order.order_id,
                status: order.status,
            });
        }

        let purchased_at = Utc::now();
        let transaction_id = callback.transaction_id();

        // The sweep may expire the order between the read above and this update,
        // so the status that matched decides whether the coupon use comes back.
        let from_expired = if self
            .store
            .activate_order(&order.order_id, OrderStatus::Pending, transaction_id, purchased_at)
            .await?
        {
            false
        } else if self
            .store
            .activate_order(&order.order_id, OrderStatus::Expired, transaction_id, purchased_at)
            .await?
        {
            true
        } else {
            let current = self
                .store
                .get_order(&order.order_id)
                .await?
                .ok_or_else(|| SeasonPassError::OrderNotFound(order.order_id.clone()))?;

            return if current.status == OrderStatus::Active {
                Ok(CallbackOutcome::AlreadyActive {
                    order_id: current.order_id,
                })
            } else {
                Err(SeasonPassError::InvalidTransition {
                    order_id: current.order_id,
                    status: current.status,
                })
            };
        };

        // Expiry released the reservation; the paid order takes its use back.
        if from_expired
            && let Some(code) = order.coupon_code.as_deref()
            && !self.store.reserve_coupon_use(code).await?
        {
            warn!(order_id = %order.order_id, coupon = code, "Late payment over coupon usage limit");
        }

        record_order_outcome("activated");
        info!(
            order_id = %order.order_id,
            transaction_id = transaction_id.unwrap_or("-"),
            "Season pass activated"
        );

        self.issue_invoice(&order, transaction_id, purchased_at).await;

        Ok(CallbackOutcome::Activated {
            order_id: order.order_id,
        })
    }

    async fn handle_payment_failure(
        &self,
        callback: &TranzilaCallback,
    ) -> Result<CallbackOutcome, SeasonPassError> {
        let order = self.load_callback_order(callback).await?;

        if self
            .store
            .transition_order(&order.order_id, OrderStatus::Pending, OrderStatus::Failed)
            .await?
        {
            self.release_coupon(&order).await;
            record_order_outcome("failed");
            info!(order_id = %order.order_id, response = %callback.response, "Season pass payment failed");

            return Ok(CallbackOutcome::MarkedFailed {
                order_id: order.order_id,
            });
        }

        debug!(order_id = %order.order_id, status = %order.status, "Fail callback for non-pending order");
        Ok(CallbackOutcome::Unchanged {
            order_id: order.order_id,
            status: order.status,
        })
    }

    async fn check_access(
        &self,
        user: Option<&User>,
        series_id: SeriesId,
    ) -> Result<AccessStatus, SeasonPassError> {
        let Some(user) = user else {
            return Ok(AccessStatus {
                has_access: false,
                purchase_date: None,
            });
        };

        let pass = self.store.find_active_pass(user.id, series_id).await?;

        Ok(AccessStatus {
            has_access: pass.is_some(),
            purchase_date: pass.and_then(|p| p.purchased_at),
        })
    }

    async fn my_passes(&self, user: &User) -> Result<Vec<PassSummary>, SeasonPassError> {
        let passes = self.store.list_active_passes(user.id).await?;

        Ok(passes
            .into_iter()
            .map(|(pass, series)| PassSummary {
                order_id: pass.order_id,
                series_id: pass.series_id,
                status: pass.status,
                price: pass.price,
                discount_amount: pass.discount_amount,
                final_price: pass.final_price,
                currency: pass.currency,
                coupon_code: pass.coupon_code,
                purchased_at: pass.purchased_at,
                invoice_url: pass.invoice_url,
                series: series.map(|s| SeriesSummary {
                    id: s.id,
                    title: s.title,
                    poster_url: s.poster_url,
                    total_episodes: s.total_episodes,
                }),
            })
            .collect())
    }

    async fn get_invoice(&self, order_id: &str) -> Result<InvoiceInfo, SeasonPassError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| SeasonPassError::OrderNotFound(order_id.to_string()))?;

        Ok(InvoiceInfo {
            invoice_url: order.invoice_url,
            invoice_number: order.invoice_number,
        })
    }

    async fn expire_stale_orders(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<u64, SeasonPassError> {
        let stale = self.store.list_stale_pending_orders(older_than).await?;
        let mut expired = 0;

        for order in stale {
            if self
                .store
                .transition_order(&order.order_id, OrderStatus::Pending, OrderStatus::Expired)
                .await?
            {
                self.release_coupon(&order).await;
                record_order_outcome("expired");
                expired += 1;
            }
        }

        if expired > 0 {
            info!(count = expired, "Expired stale pending orders");
        }

        Ok(expired)
    }
}
