//! Tranzila hosted payment page: link building and callback verification.
//!
//! Building the link is pure string templating; no request is made until the
//! customer's browser opens it. Order, user and series ids travel as custom
//! fields that Tranzila echoes back in the callback POST, together with a
//! `sig` field so the callback can be authenticated.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use url::Url;

use crate::config::TranzilaConfig;
use crate::domain::{Money, SeriesId, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Response code Tranzila reports for an approved transaction.
pub const SUCCESS_RESPONSE_CODE: &str = "000";

#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    pub order_id: &'a str,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub amount: Money,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub customer_phone: Option<&'a str>,
    pub description: &'a str,
}

/// Form body Tranzila posts to the success/fail endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranzilaCallback {
    #[serde(rename = "Response")]
    pub response: String,

    #[serde(rename = "orderId")]
    pub order_id: String,

    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "seriesId")]
    pub series_id: String,

    pub sig: String,

    /// Tranzila transaction index
    pub index: Option<String>,

    #[serde(rename = "ConfirmationCode")]
    pub confirmation_code: Option<String>,

    pub sum: Option<String>,
}

impl TranzilaCallback {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.response == SUCCESS_RESPONSE_CODE
    }

    /// Provider transaction reference, preferring the transaction index.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        [self.index.as_deref(), self.confirmation_code.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct TranzilaClient {
    config: TranzilaConfig,
    success_url: String,
    fail_url: String,
}

impl TranzilaClient {
    /// `public_api_url` is where Tranzila can reach this service.
    #[must_use]
    pub fn new(config: TranzilaConfig, public_api_url: &str) -> Self {
        let base = public_api_url.trim_end_matches('/');
        Self {
            config,
            success_url: format!("{base}/api/season-pass/tranzila/success"),
            fail_url: format!("{base}/api/season-pass/tranzila/fail"),
        }
    }

    pub fn payment_url(&self, request: &PaymentRequest<'_>) -> Result<Url> {
        let endpoint = format!(
            "{}/{}/iframenew.php",
            self.config.base_url.trim_end_matches('/'),
            self.config.terminal_name
        );

        let user_id = request.user_id.to_string();
        let series_id = request.series_id.to_string();
        let sig = self.sign(request.order_id, &user_id, &series_id)?;
        let sum = request.amount.to_string();
        let currency = self.config.currency_code.to_string();

        let mut params: Vec<(&str, &str)> = vec![
            ("sum", &sum),
            ("currency", &currency),
            ("cred_type", "1"),
            ("tranmode", "A"),
            ("lang", &self.config.lang),
            ("pdesc", request.description),
            ("contact", request.customer_name),
            ("email", request.customer_email),
            ("success_url_address", &self.success_url),
            ("fail_url_address", &self.fail_url),
            ("notify_url_address", &self.success_url),
            ("orderId", request.order_id),
            ("userId", &user_id),
            ("seriesId", &series_id),
            ("sig", &sig),
        ];

        if let Some(phone) = request.customer_phone {
            params.push(("phone", phone));
        }

        Url::parse_with_params(&endpoint, &params).context("Failed to build Tranzila payment URL")
    }

    /// Lowercase hex HMAC-SHA256 over `orderId|userId|seriesId`.
    pub fn sign(&self, order_id: &str, user_id: &str, series_id: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.callback_secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid Tranzila callback secret: {e}"))?;
        mac.update(format!("{order_id}|{user_id}|{series_id}").as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of the echoed `sig` field.
    #[must_use]
    pub fn verify_callback(&self, callback: &TranzilaCallback) -> bool {
        let Ok(expected) = self.sign(&callback.order_id, &callback.user_id, &callback.series_id)
        else {
            return false;
        };

        let received = callback.sig.trim().to_ascii_lowercase();
        expected.as_bytes().ct_eq(received.as_bytes()).into()
    }
}
