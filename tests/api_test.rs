use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt;

use ferrofit::{
    api::{self, state::AppState},
    auth::AuthService,
    config::Settings,
    notifier::ChangeNotifier,
    repository::{
        SqliteCheckinRepository, SqlitePaymentRepository, SqlitePlanRepository,
        SqliteStaffRepository, SqliteUserRepository,
    },
    service::ServiceContext,
};

async fn build_app() -> anyhow::Result<(Router, SqlitePool)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let settings = Settings::default();

    let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));
    let plan_repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepository::new(pool.clone()));
    let checkin_repo = Arc::new(SqliteCheckinRepository::new(pool.clone()));
    let staff_repo = Arc::new(SqliteStaffRepository::new(pool.clone()));
    let auth_service = Arc::new(AuthService::new(settings.auth.jwt_secret.clone()));

    let service_context = Arc::new(ServiceContext::new(
        user_repo.clone(),
        plan_repo,
        payment_repo.clone(),
        checkin_repo.clone(),
        staff_repo,
        auth_service,
        pool.clone(),
    ));

    let notifier = Arc::new(ChangeNotifier::new(
        checkin_repo,
        payment_repo,
        user_repo,
        &settings.notifier,
    ));

    let state = AppState::new(service_context, notifier, None, None, Arc::new(settings));

    Ok((api::create_app(state), pool))
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Value,
) -> anyhow::Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, value))
}

async fn get(app: &Router, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> anyhow::Result<()> {
    let (app, pool) = build_app().await?;

    let payload = json!({
        "nome": "Maria Silva",
        "email": "maria@example.com",
        "senha": "segredo123",
    });

    let (status, body) = send_json(&app, "POST", "/auth-usuarios/register", payload.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["token"].is_string());
    assert_eq!(body["usuario"]["status"], json!("pending"));

    // Same email again: 400, and no second row.
    let (status, body) = send_json(&app, "POST", "/auth-usuarios/register", payload).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Usuário já cadastrado"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn login_flow() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    send_json(
        &app,
        "POST",
        "/auth-usuarios/register",
        json!({ "nome": "João", "email": "joao@example.com", "senha": "segredo123" }),
    )
    .await?;

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth-usuarios/login",
        json!({ "email": "joao@example.com", "senha": "errada" }),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth-usuarios/login",
        json!({ "email": "ninguem@example.com", "senha": "segredo123" }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth-usuarios/login",
        json!({ "email": "joao@example.com", "senha": "segredo123" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    // Login reconciles: no plan means sem_plano/inativo.
    assert_eq!(body["usuario"]["status_plano"], json!("sem_plano"));

    Ok(())
}

#[tokio::test]
async fn plan_crud_round_trip() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (status, plan) = send_json(
        &app,
        "POST",
        "/planos",
        json!({ "nome": "Mensal", "descricao": "Sem limite", "preco": 99.9, "limite_checkins": 0 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let plan_id = plan["id"].as_i64().unwrap();

    let (status, plans) = get(&app, "/planos").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plans.as_array().unwrap().len(), 1);

    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/planos/{plan_id}"),
        json!({ "nome": "Mensal Plus", "descricao": "Sem limite", "preco": 119.9, "limite_checkins": 0 }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["nome"], json!("Mensal Plus"));

    let (status, _) = send_json(&app, "DELETE", &format!("/planos/{plan_id}"), json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/planos/{plan_id}"),
        json!({ "nome": "X", "descricao": "", "preco": 1.0, "limite_checkins": 0 }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn checkin_requires_an_active_payment() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (_, body) = send_json(
        &app,
        "POST",
        "/auth-usuarios/register",
        json!({ "nome": "Ana", "email": "ana@example.com", "senha": "segredo123" }),
    )
    .await?;
    let user_id = body["usuario"]["id"].as_i64().unwrap();

    let (status, body) =
        send_json(&app, "POST", "/checkins", json!({ "usuario_id": user_id })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Usuário não possui pagamento ativo."));

    Ok(())
}

#[tokio::test]
async fn payment_intake_activates_the_subscription() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (_, body) = send_json(
        &app,
        "POST",
        "/auth-usuarios/register",
        json!({ "nome": "Rui", "email": "rui@example.com", "senha": "segredo123" }),
    )
    .await?;
    let user_id = body["usuario"]["id"].as_i64().unwrap();

    let (_, plan) = send_json(
        &app,
        "POST",
        "/planos",
        json!({ "nome": "Mensal", "descricao": "", "preco": 99.9, "limite_checkins": 0 }),
    )
    .await?;
    let plan_id = plan["id"].as_i64().unwrap();

    let (status, payment) = send_json(
        &app,
        "POST",
        "/pagamentos",
        json!({ "usuario_id": user_id, "plano_id": plan_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], json!("pago"));

    // The same transaction set the plan and reconciled the status.
    let (status, body) = get(&app, &format!("/auth-usuarios/status/{user_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("active"));

    let (status, body) = get(&app, &format!("/auth-usuarios/{user_id}/plano")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_plano"], json!("ativo"));
    assert_eq!(body["nome_plano"], json!("Mensal"));

    // Check-in now passes the payment gate.
    let (status, _) = send_json(&app, "POST", "/checkins", json!({ "usuario_id": user_id })).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = get(&app, &format!("/checkins/stats/{user_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["diarios"], json!(1));

    Ok(())
}

#[tokio::test]
async fn cancel_and_reactivate_endpoints() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (_, body) = send_json(
        &app,
        "POST",
        "/auth-usuarios/register",
        json!({ "nome": "Bia", "email": "bia@example.com", "senha": "segredo123" }),
    )
    .await?;
    let user_id = body["usuario"]["id"].as_i64().unwrap();

    // Cancel without a plan is a client error.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/auth-usuarios/{user_id}/cancelar-plano"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Reactivate requires cancelado.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/auth-usuarios/{user_id}/reativar-plano"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, plan) = send_json(
        &app,
        "POST",
        "/planos",
        json!({ "nome": "Mensal", "descricao": "", "preco": 99.9, "limite_checkins": 0 }),
    )
    .await?;
    send_json(
        &app,
        "POST",
        "/pagamentos",
        json!({ "usuario_id": user_id, "plano_id": plan["id"] }),
    )
    .await?;

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/auth-usuarios/{user_id}/cancelar-plano"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, &format!("/auth-usuarios/{user_id}/status-plano")).await?;
    assert_eq!(body["data"]["status_plano"], json!("cancelado"));

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/auth-usuarios/{user_id}/reativar-plano"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, &format!("/auth-usuarios/{user_id}/status-plano")).await?;
    assert_eq!(body["data"]["status_plano"], json!("ativo"));

    Ok(())
}

#[tokio::test]
async fn staff_management_requires_a_staff_token() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (status, _) = get(&app, "/funcionarios").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A member token is not enough.
    let (_, body) = send_json(
        &app,
        "POST",
        "/auth-usuarios/register",
        json!({ "nome": "Leo", "email": "leo@example.com", "senha": "segredo123" }),
    )
    .await?;
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/funcionarios")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn reports_shape() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (status, body) = get(&app, "/relatorios/usuarios").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_usuarios"], json!(0));
    assert_eq!(body["ativos"], json!(0));
    assert_eq!(body["inadimplentes"], json!(0));

    let (status, _) = get(&app, "/relatorios/checkins").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        get(&app, "/relatorios/checkins?inicio=2026-01-01&fim=2026-01-31").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_checkins"], json!(0));

    let (status, body) =
        get(&app, "/relatorios/financeiro?inicio=2026-01-01&fim=2026-01-31").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_recebido"], json!(0.0));

    let (status, body) = get(&app, "/relatorios/grafico-financeiro").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());

    Ok(())
}

#[tokio::test]
async fn checkin_range_is_zero_filled() -> anyhow::Result<()> {
    let (app, _pool) = build_app().await?;

    let (status, body) = get(&app, "/checkins?inicio=2026-03-01&fim=2026-03-07").await?;
    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert!(days.iter().all(|d| d["total"] == json!(0)));
    assert_eq!(days[0]["data"], json!("2026-03-01"));

    let (status, _) = get(&app, "/checkins").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}
