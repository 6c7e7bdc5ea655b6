use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Duration, Utc};
use serde_json::{json, Value};

use crate::{
    api::handlers::checkins::{parse_range, RangeParams},
    api::state::AppState,
    error::Result,
};

pub async fn users(State(state): State<AppState>) -> Result<Json<Value>> {
    let ctx = &state.service_context;
    let now = Utc::now();

    let total = ctx.user_repo.count_all().await?;
    let active = ctx.payment_repo.count_active_payers(now).await?;
    let delinquent = ctx.payment_repo.count_delinquent_payers(now).await?;

    Ok(Json(json!({
        "total_usuarios": total,
        "ativos": active,
        "inadimplentes": delinquent,
    })))
}

pub async fn plans(State(state): State<AppState>) -> Result<Json<Value>> {
    let total = state.service_context.plan_repo.count_all().await?;

    Ok(Json(json!({ "total_planos": total })))
}

pub async fn checkins(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>> {
    let (start, end) = parse_range(&params)?;

    let total = state
        .service_context
        .checkin_repo
        .count_between(start, end)
        .await?;

    Ok(Json(json!({
        "periodo": { "inicio": start, "fim": end },
        "total_checkins": total,
    })))
}

pub async fn revenue(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>> {
    let (start, end) = parse_range(&params)?;

    let total = state
        .service_context
        .payment_repo
        .revenue_between(start, end)
        .await?;

    Ok(Json(json!({
        "periodo": { "inicio": start, "fim": end },
        "total_recebido": total,
    })))
}

/// Monthly revenue series for the dashboard chart, covering the last
/// twelve months including the current one.
pub async fn revenue_chart(State(state): State<AppState>) -> Result<Json<Value>> {
    let today = Utc::now().date_naive();
    let since = (today - Duration::days(365))
        .with_day(1)
        .unwrap_or(today);

    let series = state
        .service_context
        .payment_repo
        .monthly_revenue(since)
        .await?;

    Ok(Json(json!(series)))
}
