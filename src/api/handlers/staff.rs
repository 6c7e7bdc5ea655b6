use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::state::AppState,
    auth::{AuthService, ROLE_STAFF},
    domain::{CreateStaffRequest, UpdateStaffRequest},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct StaffLoginRequest {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<StaffLoginRequest>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    let staff = ctx
        .staff_repo
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Funcionário não encontrado".to_string()))?;

    let valid = AuthService::verify_password(&req.password, &staff.password_hash).await?;
    if !valid {
        return Err(AppError::Unauthorized("Senha incorreta".to_string()));
    }

    let token = ctx.auth_service.issue_token(
        staff.id,
        &staff.email,
        ROLE_STAFF,
        state.settings.auth.login_token_hours,
    )?;

    Ok(Json(json!({
        "message": "Login realizado com sucesso",
        "token": token,
        "funcionario": staff,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ctx = &state.service_context;

    if ctx.staff_repo.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email já cadastrado".to_string()));
    }

    let password_hash = AuthService::hash_password(&req.password).await?;
    let staff = ctx.staff_repo.create(req, password_hash).await?;

    Ok((StatusCode::CREATED, Json(json!(staff))))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let staff = state.service_context.staff_repo.list().await?;
    Ok(Json(json!(staff)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStaffRequest>,
) -> Result<Json<Value>> {
    // Only re-hash when the caller actually sent a new password.
    let password_hash = match &req.password {
        Some(password) => Some(AuthService::hash_password(password).await?),
        None => None,
    };

    let staff = state
        .service_context
        .staff_repo
        .update(id, req, password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Funcionário não encontrado".to_string()))?;

    Ok(Json(json!(staff)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let deleted = state.service_context.staff_repo.delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("Funcionário não encontrado".to_string()));
    }

    Ok(Json(json!({ "message": "Funcionário deletado com sucesso" })))
}
