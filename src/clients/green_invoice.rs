use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::GreenInvoiceConfig;
use crate::services::invoice_service::{
    InvoiceError, InvoiceGenerator, InvoiceRequest, IssuedInvoice,
};

/// Receipt / tax invoice
const DOCUMENT_TYPE_TAX_INVOICE_RECEIPT: u16 = 320;

/// Payment line type for credit card payments
const PAYMENT_TYPE_CREDIT_CARD: u8 = 3;

#[derive(Serialize)]
struct TokenRequest<'a> {
    id: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct DocumentResponse {
    id: String,
    #[serde(default)]
    number: Option<serde_json::Value>,
    #[serde(default)]
    url: Option<DocumentUrl>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentUrl {
    Plain(String),
    Localized {
        origin: Option<String>,
        he: Option<String>,
    },
}

impl DocumentUrl {
    fn into_link(self) -> Option<String> {
        match self {
            Self::Plain(url) => Some(url),
            Self::Localized { origin, he } => he.or(origin),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "errorMessage")]
    message: Option<String>,
}

#[derive(Clone)]
pub struct GreenInvoiceClient {
    client: Client,
    config: GreenInvoiceConfig,
}

impl GreenInvoiceClient {
    #[must_use]
    pub const fn with_shared_client(client: Client, config: GreenInvoiceConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    async fn authenticate(&self) -> Result<String, InvoiceError> {
        let response = self
            .client
            .post(self.endpoint("/account/token"))
            .json(&TokenRequest {
                id: &self.config.api_key_id,
                secret: &self.config.api_secret,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InvoiceError::Auth(error_message(response).await));
        }

        let body: TokenResponse = response.json().await?;
        debug!("Obtained GreenInvoice token");
        Ok(body.token)
    }

    async fn create_document(
        &self,
        token: &str,
        request: &InvoiceRequest,
    ) -> Result<IssuedInvoice, InvoiceError> {
        let response = self
            .client
            .post(self.endpoint("/documents"))
            .bearer_auth(token)
            .json(&document_payload(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InvoiceError::Document(error_message(response).await));
        }

        let body: DocumentResponse = response.json().await?;
        let number = match body.number {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => body.id.clone(),
        };

        Ok(IssuedInvoice {
            document_id: body.id,
            number,
            url: body.url.and_then(DocumentUrl::into_link),
        })
    }

    async fn send_document(
        &self,
        token: &str,
        document_id: &str,
        recipient: &str,
    ) -> Result<(), InvoiceError> {
        let response = self
            .client
            .post(self.endpoint(&format!("/documents/{document_id}/send")))
            .bearer_auth(token)
            .json(&json!({ "recipients": [recipient] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InvoiceError::Send(error_message(response).await));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl InvoiceGenerator for GreenInvoiceClient {
    async fn generate(&self, request: &InvoiceRequest) -> Result<IssuedInvoice, InvoiceError> {
        if !self.config.enabled {
            return Err(InvoiceError::Disabled);
        }

        let token = self.authenticate().await?;
        let invoice = self.create_document(&token, request).await?;
        self.send_document(&token, &invoice.document_id, &request.customer_email)
            .await?;

        info!(
            order_id = %request.order_id,
            invoice_number = %invoice.number,
            "Issued invoice"
        );

        Ok(invoice)
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(text);

    format!("status={status}, message={message}")
}

fn document_payload(request: &InvoiceRequest) -> serde_json::Value {
    let amount = request.amount.as_major();
    let date = request.paid_at.format("%Y-%m-%d").to_string();

    let mut client = json!({
        "name": request.customer_name,
        "emails": [request.customer_email],
        "add": false,
    });
    if let Some(phone) = &request.customer_phone {
        client["phone"] = json!(phone);
    }

    let mut payment = json!({
        "type": PAYMENT_TYPE_CREDIT_CARD,
        "date": date,
        "price": amount,
        "currency": request.currency,
    });
    if let Some(transaction_id) = &request.transaction_id {
        payment["transactionId"] = json!(transaction_id);
    }

    json!({
        "type": DOCUMENT_TYPE_TAX_INVOICE_RECEIPT,
        "description": request.description,
        "date": date,
        "lang": "he",
        "currency": request.currency,
        "remarks": format!("Order {}", request.order_id),
        "client": client,
        "income": [{
            "description": request.description,
            "quantity": 1,
            "price": amount,
            "currency": request.currency,
            "vatType": 1,
        }],
        "payment": [payment],
    })
}
