use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::state::AppState,
    auth::ROLE_USER,
    domain::RegisterUserRequest,
    error::{AppError, Result},
    repository::NewUser,
};

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<Value>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ctx = &state.service_context;

    if ctx.user_repo.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Usuário já cadastrado".to_string()));
    }

    let password_hash = crate::auth::AuthService::hash_password(&req.password).await?;

    let user = ctx
        .user_repo
        .create(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
        })
        .await?;

    let token = ctx.auth_service.issue_token(
        user.id,
        &user.email,
        ROLE_USER,
        state.settings.auth.register_token_hours,
    )?;

    Ok(Json(json!({
        "success": true,
        "message": "Usuário registrado com sucesso. Faça o pagamento para ativar sua conta.",
        "token": token,
        "usuario": UserSummary {
            id: user.id,
            nome: user.name,
            email: user.email,
            status: user.status.as_str().to_string(),
        },
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    let user = ctx
        .user_repo
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    let valid =
        crate::auth::AuthService::verify_password(&req.password, &user.password_hash).await?;
    if !valid {
        return Err(AppError::Unauthorized("Senha incorreta".to_string()));
    }

    // Bring the stored status up to date before returning it. Login must
    // not fail because the reconciliation did.
    if let Err(e) = ctx.status_service.reconcile_user(user.id).await {
        tracing::error!("Failed to reconcile user {} at login: {}", user.id, e);
    }

    let user = ctx
        .user_repo
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    let token = ctx.auth_service.issue_token(
        user.id,
        &user.email,
        ROLE_USER,
        state.settings.auth.login_token_hours,
    )?;

    Ok(Json(json!({
        "message": "Login realizado com sucesso",
        "token": token,
        "usuario": {
            "id": user.id,
            "nome": user.name,
            "email": user.email,
            "status": user.status,
            "plano_atual_id": user.current_plan_id,
            "status_plano": user.plan_status,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    let email = req
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email é obrigatório".to_string()))?;

    let ctx = &state.service_context;

    if ctx.user_repo.find_by_email(&email).await?.is_none() {
        return Err(AppError::NotFound("Email não encontrado".to_string()));
    }

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Internal("SMTP is not configured".to_string()))?;

    let code = ctx.reset_codes.issue(&email).await?;
    mailer.send_reset_code(&email, &code).await?;

    Ok(Json(json!({
        "message": "Código de recuperação enviado para o email"
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "novaSenha")]
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    if !ctx
        .reset_codes
        .verify_and_consume(&req.email, &req.code)
        .await?
    {
        return Err(AppError::BadRequest("Código inválido".to_string()));
    }

    let password_hash = crate::auth::AuthService::hash_password(&req.new_password).await?;
    ctx.user_repo
        .update_password(&req.email, &password_hash)
        .await?;

    Ok(Json(json!({ "message": "Senha atualizada com sucesso" })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "skipUpdate")]
    pub skip_update: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    // The listing reconciles everyone first so the dashboard never shows
    // stale statuses; `?skipUpdate=true` skips that for cheap reads.
    if params.skip_update.as_deref() != Some("true") {
        ctx.status_service.reconcile_all().await?;
    }

    let users = ctx.user_repo.list_overview().await?;
    Ok(Json(json!(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    if let Err(e) = ctx.status_service.reconcile_user(id).await {
        tracing::error!("Failed to reconcile user {}: {}", id, e);
    }

    let user = ctx
        .user_repo
        .overview_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    Ok(Json(json!(user)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    if let Err(e) = ctx.status_service.reconcile_user(id).await {
        tracing::error!("Failed to reconcile user {}: {}", id, e);
    }

    let user = ctx
        .user_repo
        .overview_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "nome_plano": user.plan_name.unwrap_or_else(|| "Sem plano".to_string()),
        "descricao_plano": user.plan_description.unwrap_or_default(),
        "preco_plano": user.plan_price.unwrap_or(0.0),
        "status_plano": user.plan_status,
        "status_pagamento": user.last_payment_status.unwrap_or_else(|| "pendente".to_string()),
    })))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    if let Err(e) = ctx.status_service.reconcile_user(id).await {
        tracing::error!("Failed to reconcile user {}: {}", id, e);
    }

    let user = ctx
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "status": user.status,
        "usuario": UserSummary {
            id: user.id,
            nome: user.name,
            email: user.email,
            status: user.status.as_str().to_string(),
        },
    })))
}

pub async fn get_plan_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let ctx = &state.service_context;

    if let Err(e) = ctx.status_service.reconcile_user(id).await {
        tracing::error!("Failed to reconcile user {}: {}", id, e);
    }

    let user = ctx
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": user.id,
            "nome": user.name,
            "email": user.email,
            "plano_atual_id": user.current_plan_id,
            "status_plano": user.plan_status,
            "data_atualizacao_plano": user.plan_status_updated_at,
        },
    })))
}

pub async fn cancel_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.service_context.status_service.cancel_plan(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Plano cancelado com sucesso"
    })))
}

pub async fn reactivate_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state
        .service_context
        .status_service
        .reactivate_plan(id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Plano reativado com sucesso"
    })))
}

pub async fn batch_reconcile(State(state): State<AppState>) -> Result<Json<Value>> {
    let outcome = state.service_context.status_service.reconcile_all().await?;

    state
        .notifier
        .notify_manual("Status atualizados em lote");

    Ok(Json(json!({
        "success": true,
        "message": "Status atualizados em lote com sucesso",
        "dados": outcome,
    })))
}

pub async fn repair_status(State(state): State<AppState>) -> Result<(StatusCode, Json<Value>)> {
    let outcome = state
        .service_context
        .status_service
        .repair_inconsistencies()
        .await?;

    state.notifier.notify_manual("Status corrigidos");

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Status corrigidos com sucesso",
            "dados": outcome,
        })),
    ))
}
