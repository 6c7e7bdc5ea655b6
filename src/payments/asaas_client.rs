use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Synthetic identifier prefix for simulated PIX charges. The response
/// shape is identical to a real charge; this prefix is the only way to
/// tell them apart.
pub const PIX_SIMULATED_PREFIX: &str = "pix_sim_";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomerRequest {
    #[serde(rename = "name")]
    pub name: String,
    pub email: String,
    #[serde(rename = "cpfCnpj", skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AsaasCustomer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargeRequest {
    /// Gateway customer id, from `create_customer`.
    pub customer: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AsaasCharge {
    pub id: String,
    pub status: String,
    pub value: f64,
    #[serde(rename = "invoiceUrl")]
    pub invoice_url: Option<String>,
    #[serde(rename = "bankSlipUrl")]
    pub bank_slip_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentLinkRequest {
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AsaasPaymentLink {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixCharge {
    pub id: String,
    #[serde(rename = "encodedImage")]
    pub encoded_image: String,
    pub payload: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    errors: Option<Vec<GatewayError>>,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerList {
    data: Vec<AsaasCustomer>,
}

/// Thin client for the Asaas billing API. Each operation surfaces the
/// gateway's own error description when it has one; there is no retry
/// logic.
pub struct AsaasClient {
    http: reqwest::Client,
    base_url: String,
}

impl AsaasClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "access_token",
            HeaderValue::from_str(&api_key)
                .map_err(|e| AppError::Internal(format!("Invalid billing API key: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub async fn create_customer(&self, request: CustomerRequest) -> Result<AsaasCustomer> {
        let response = self
            .http
            .post(format!("{}/customers", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Erro ao criar cliente: {}", e)))?;

        Self::parse_response(response, "Erro ao criar cliente").await
    }

    /// A lookup failure is treated as "no such customer", matching how
    /// the checkout flow uses this: absent customers get created.
    pub async fn find_customer_by_email(&self, email: &str) -> Result<Vec<AsaasCustomer>> {
        let response = self
            .http
            .get(format!("{}/customers", self.base_url))
            .query(&[("email", email)])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let list: CustomerList = resp
                    .json()
                    .await
                    .map_err(|e| AppError::External(format!("Erro ao buscar cliente: {}", e)))?;
                Ok(list.data)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Card charge, due in 3 days.
    pub async fn create_card_charge(&self, request: ChargeRequest) -> Result<AsaasCharge> {
        self.create_charge(request, "CREDIT_CARD", 3, "Erro ao criar pagamento cartão")
            .await
    }

    /// Boleto charge, due in 5 days.
    pub async fn create_boleto_charge(&self, request: ChargeRequest) -> Result<AsaasCharge> {
        self.create_charge(request, "BOLETO", 5, "Erro ao criar boleto")
            .await
    }

    async fn create_charge(
        &self,
        request: ChargeRequest,
        billing_type: &str,
        due_in_days: i64,
        context: &str,
    ) -> Result<AsaasCharge> {
        #[derive(Serialize)]
        struct ChargeBody {
            #[serde(flatten)]
            request: ChargeRequest,
            #[serde(rename = "billingType")]
            billing_type: String,
            #[serde(rename = "dueDate")]
            due_date: String,
        }

        let body = ChargeBody {
            request,
            billing_type: billing_type.to_string(),
            due_date: (Utc::now() + Duration::days(due_in_days))
                .format("%Y-%m-%d")
                .to_string(),
        };

        let response = self
            .http
            .post(format!("{}/payments", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::External(format!("{}: {}", context, e)))?;

        Self::parse_response(response, context).await
    }

    /// Hosted payment link accepting card and boleto.
    pub async fn create_payment_link(
        &self,
        request: PaymentLinkRequest,
    ) -> Result<AsaasPaymentLink> {
        #[derive(Serialize)]
        struct LinkBody {
            #[serde(flatten)]
            request: PaymentLinkRequest,
            #[serde(rename = "billingType")]
            billing_type: Vec<String>,
        }

        let body = LinkBody {
            request,
            billing_type: vec!["CREDIT_CARD".to_string(), "BOLETO".to_string()],
        };

        let response = self
            .http
            .post(format!("{}/paymentLinks", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Erro ao criar link: {}", e)))?;

        Self::parse_response(response, "Erro ao criar link").await
    }

    /// The sandbox environment has no PIX support, so the charge is
    /// simulated: fixed QR payload, synthetic id. Same shape as a real
    /// charge.
    pub async fn create_pix_charge(&self, _request: ChargeRequest) -> Result<PixCharge> {
        Ok(PixCharge {
            id: format!("{}{}", PIX_SIMULATED_PREFIX, Uuid::new_v4()),
            encoded_image:
                "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg=="
                    .to_string(),
            payload: "00020101021226860014br.gov.bcb.pix2561qrcode.asaas.com/qr/mock/123456"
                .to_string(),
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::External(format!("{}: {}", context, e)));
        }

        let description = response
            .json::<GatewayErrorBody>()
            .await
            .ok()
            .and_then(|body| body.errors)
            .and_then(|errors| errors.into_iter().next())
            .and_then(|err| err.description)
            .unwrap_or_else(|| format!("HTTP {}", status));

        Err(AppError::External(format!("{}: {}", context, description)))
    }
}
