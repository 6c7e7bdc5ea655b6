use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    api::state::AppState,
    domain::{CreatePaymentRequest, PaymentStatus},
    error::{AppError, Result},
    payments::{AsaasClient, ChargeRequest, CustomerRequest, PaymentLinkRequest},
};

/// The dashboard sends dates either as plain `YYYY-MM-DD` or as full
/// RFC 3339 timestamps, depending on the form.
fn parse_wire_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
        return Ok(DateTime::from_naive_utc_and_offset(midnight, Utc));
    }

    Err(AppError::BadRequest(format!("Data inválida: {}", value)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    pub usuario_id: i64,
    pub plano_id: i64,
    pub status: Option<PaymentStatus>,
    pub data_pagamento: Option<String>,
    pub data_vencimento: Option<String>,
    pub gateway_charge_id: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentBody>,
) -> Result<(StatusCode, Json<Value>)> {
    let payment_date = match &body.data_pagamento {
        Some(raw) => parse_wire_date(raw)?,
        None => Utc::now(),
    };
    let due_date = match &body.data_vencimento {
        Some(raw) => parse_wire_date(raw)?,
        None => payment_date + Duration::days(30),
    };

    let payment = state
        .service_context
        .subscription_service
        .save_subscription(CreatePaymentRequest {
            user_id: body.usuario_id,
            plan_id: body.plano_id,
            status: body.status.unwrap_or(PaymentStatus::Paid),
            payment_date,
            due_date,
            gateway_charge_id: body.gateway_charge_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(json!(payment))))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Path(usuario_id): Path<i64>,
) -> Result<Json<Value>> {
    let payments = state
        .service_context
        .payment_repo
        .list_by_user(usuario_id)
        .await?;

    Ok(Json(json!(payments)))
}

pub async fn last_paid(
    State(state): State<AppState>,
    Path(usuario_id): Path<i64>,
) -> Result<Json<Value>> {
    let payment = state
        .service_context
        .payment_repo
        .last_paid_by_user(usuario_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Nenhum pagamento pago encontrado".to_string()))?;

    Ok(Json(json!(payment)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: PaymentStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Value>> {
    let payment = state
        .service_context
        .payment_repo
        .update_status(id, body.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Pagamento não encontrado".to_string()))?;

    Ok(Json(json!(payment)))
}

fn billing_client(state: &AppState) -> Result<Arc<AsaasClient>> {
    state
        .billing_client
        .clone()
        .ok_or_else(|| AppError::External("Gateway de pagamento não configurado".to_string()))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(body): Json<CustomerRequest>,
) -> Result<Json<Value>> {
    let client = billing_client(&state)?;

    // Reuse an existing gateway customer for the same email.
    if let Some(existing) = client
        .find_customer_by_email(&body.email)
        .await?
        .into_iter()
        .next()
    {
        return Ok(Json(json!(existing)));
    }

    let customer = client.create_customer(body).await?;
    Ok(Json(json!(customer)))
}

pub async fn create_card_charge(
    State(state): State<AppState>,
    Json(body): Json<ChargeRequest>,
) -> Result<Json<Value>> {
    let charge = billing_client(&state)?.create_card_charge(body).await?;
    Ok(Json(json!(charge)))
}

pub async fn create_pix_charge(
    State(state): State<AppState>,
    Json(body): Json<ChargeRequest>,
) -> Result<Json<Value>> {
    let charge = billing_client(&state)?.create_pix_charge(body).await?;
    Ok(Json(json!(charge)))
}

pub async fn create_boleto_charge(
    State(state): State<AppState>,
    Json(body): Json<ChargeRequest>,
) -> Result<Json<Value>> {
    let charge = billing_client(&state)?.create_boleto_charge(body).await?;
    Ok(Json(json!(charge)))
}

pub async fn create_payment_link(
    State(state): State<AppState>,
    Json(body): Json<PaymentLinkRequest>,
) -> Result<Json<Value>> {
    let link = billing_client(&state)?.create_payment_link(body).await?;
    Ok(Json(json!(link)))
}
