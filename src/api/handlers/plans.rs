use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::CreatePlanRequest,
    error::{AppError, Result},
};

#[derive(Debug, serde::Deserialize)]
pub struct PlanBody {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "preco")]
    pub price: f64,
    #[serde(rename = "limite_checkins", default)]
    pub checkin_limit: i64,
}

impl From<PlanBody> for CreatePlanRequest {
    fn from(body: PlanBody) -> Self {
        CreatePlanRequest {
            name: body.name,
            description: body.description,
            price: body.price,
            checkin_limit: body.checkin_limit,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<PlanBody>,
) -> Result<(StatusCode, Json<Value>)> {
    let request: CreatePlanRequest = body.into();
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let plan = state.service_context.plan_repo.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!(plan))))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let plans = state.service_context.plan_repo.list().await?;
    Ok(Json(json!(plans)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PlanBody>,
) -> Result<Json<Value>> {
    let request: CreatePlanRequest = body.into();
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let plan = state
        .service_context
        .plan_repo
        .update(id, request)
        .await?
        .ok_or_else(|| AppError::NotFound("Plano não encontrado".to_string()))?;

    Ok(Json(json!(plan)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let deleted = state.service_context.plan_repo.delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("Plano não encontrado".to_string()));
    }

    Ok(Json(json!({ "message": "Plano deletado com sucesso" })))
}
