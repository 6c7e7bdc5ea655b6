use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct CreateCheckinRequest {
    pub usuario_id: i64,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckinRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let ctx = &state.service_context;

    // Gate on the latest paid payment, by due date.
    let payment = ctx
        .payment_repo
        .latest_paid_by_due_date(req.usuario_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Usuário não possui pagamento ativo.".to_string())
        })?;

    if payment.due_date < Utc::now() {
        return Err(AppError::BadRequest(
            "Pagamento vencido. Usuário bloqueado para check-in.".to_string(),
        ));
    }

    let checkin = ctx.checkin_repo.create(req.usuario_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Check-in realizado com sucesso!",
            "checkin": checkin,
        })),
    ))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(usuario_id): Path<i64>,
) -> Result<Json<Value>> {
    let stats = state
        .service_context
        .checkin_repo
        .stats_for_user(usuario_id, Utc::now())
        .await?;

    Ok(Json(json!(stats)))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub inicio: Option<String>,
    pub fim: Option<String>,
}

pub fn parse_range(params: &RangeParams) -> Result<(NaiveDate, NaiveDate)> {
    let (Some(inicio), Some(fim)) = (&params.inicio, &params.fim) else {
        return Err(AppError::BadRequest(
            "Parâmetros 'inicio' e 'fim' são obrigatórios.".to_string(),
        ));
    };

    let start = NaiveDate::parse_from_str(inicio, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Data 'inicio' inválida".to_string()))?;
    let end = NaiveDate::parse_from_str(fim, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Data 'fim' inválida".to_string()))?;

    Ok((start, end))
}

pub async fn daily_totals(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>> {
    let (start, end) = parse_range(&params)?;

    let totals = state
        .service_context
        .checkin_repo
        .daily_totals(start, end)
        .await?;

    Ok(Json(json!(totals)))
}
