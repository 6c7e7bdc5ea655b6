use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    #[serde(rename = "plano_id")]
    pub plan_id: i64,
    pub status: PaymentStatus,
    #[serde(rename = "data_pagamento")]
    pub payment_date: DateTime<Utc>,
    #[serde(rename = "data_vencimento")]
    pub due_date: DateTime<Utc>,
    pub gateway_charge_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[serde(rename = "pago")]
    Paid,
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "atrasado")]
    Overdue,
    #[serde(rename = "cancelado")]
    Canceled,
    #[serde(rename = "reembolsado")]
    Refunded,
    #[serde(rename = "inativo")]
    Inactive,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "pago",
            PaymentStatus::Pending => "pendente",
            PaymentStatus::Overdue => "atrasado",
            PaymentStatus::Canceled => "cancelado",
            PaymentStatus::Refunded => "reembolsado",
            PaymentStatus::Inactive => "inativo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pago" => Some(PaymentStatus::Paid),
            "pendente" => Some(PaymentStatus::Pending),
            "atrasado" => Some(PaymentStatus::Overdue),
            "cancelado" => Some(PaymentStatus::Canceled),
            "reembolsado" => Some(PaymentStatus::Refunded),
            "inativo" => Some(PaymentStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub user_id: i64,
    pub plan_id: i64,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub gateway_charge_id: Option<String>,
}
