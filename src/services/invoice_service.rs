//! Tax invoice issuance for completed purchases.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Money;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Invoice provider authentication failed: {0}")]
    Auth(String),

    #[error("Invoice document creation failed: {0}")]
    Document(String),

    #[error("Invoice delivery failed: {0}")]
    Send(String),

    #[error("Invoice provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invoicing is disabled")]
    Disabled,
}

/// Everything the provider needs to issue one receipt.
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub description: String,
    pub amount: Money,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvoice {
    pub document_id: String,
    pub number: String,
    pub url: Option<String>,
}

#[async_trait::async_trait]
pub trait InvoiceGenerator: Send + Sync {
    /// Issues the document and emails it to the customer.
    ///
    /// # Errors
    ///
    /// Returns the [`InvoiceError`] variant for the step that failed.
    async fn generate(&self, request: &InvoiceRequest) -> Result<IssuedInvoice, InvoiceError>;
}

/// Used when no invoice provider credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledInvoiceGenerator;

#[async_trait::async_trait]
impl InvoiceGenerator for DisabledInvoiceGenerator {
    async fn generate(&self, _request: &InvoiceRequest) -> Result<IssuedInvoice, InvoiceError> {
        Err(InvoiceError::Disabled)
    }
}
