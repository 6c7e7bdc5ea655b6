use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use ferrofit::{
    domain::{
        AccountStatus, CreatePaymentRequest, CreatePlanRequest, PaymentStatus, PlanStatus,
    },
    error::AppError,
    repository::{
        NewUser, PaymentRepository, PlanRepository, SqlitePaymentRepository,
        SqlitePlanRepository, SqliteUserRepository, UserRepository,
    },
    service::StatusService,
};

async fn setup() -> anyhow::Result<SqlitePool> {
    // One connection so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

struct Fixture {
    pool: SqlitePool,
    users: Arc<SqliteUserRepository>,
    payments: Arc<SqlitePaymentRepository>,
    status: StatusService,
    plan_id: i64,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let pool = setup().await?;

    let plans = SqlitePlanRepository::new(pool.clone());
    let plan = plans
        .create(CreatePlanRequest {
            name: "Mensal".to_string(),
            description: "Plano mensal".to_string(),
            price: 99.90,
            checkin_limit: 0,
        })
        .await?;

    Ok(Fixture {
        users: Arc::new(SqliteUserRepository::new(pool.clone())),
        payments: Arc::new(SqlitePaymentRepository::new(pool.clone())),
        status: StatusService::new(pool.clone()),
        plan_id: plan.id,
        pool,
    })
}

impl Fixture {
    async fn create_user(&self, email: &str) -> anyhow::Result<i64> {
        let user = self
            .users
            .create(NewUser {
                name: "Teste".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
            })
            .await?;
        Ok(user.id)
    }

    async fn assign_plan(&self, user_id: i64) -> anyhow::Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.users.set_plan_on(&mut conn, user_id, self.plan_id).await?;
        Ok(())
    }

    async fn add_paid_payment(&self, user_id: i64, age_days: i64) -> anyhow::Result<i64> {
        let payment_date = Utc::now() - Duration::days(age_days);
        let mut conn = self.pool.acquire().await?;
        let payment = self
            .payments
            .create_on(
                &mut conn,
                CreatePaymentRequest {
                    user_id,
                    plan_id: self.plan_id,
                    status: PaymentStatus::Paid,
                    payment_date,
                    due_date: payment_date + Duration::days(30),
                    gateway_charge_id: None,
                },
            )
            .await?;
        Ok(payment.id)
    }
}

#[tokio::test]
async fn user_without_plan_becomes_sem_plano() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("sem-plano@example.com").await?;
    // Payment history exists, but no plan is assigned.
    fx.add_paid_payment(user_id, 3).await?;

    fx.status.reconcile_user(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::SemPlano);
    assert_eq!(user.status, AccountStatus::Inactive);

    Ok(())
}

#[tokio::test]
async fn user_with_plan_but_no_payment_becomes_inativo() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("nunca-pagou@example.com").await?;
    fx.assign_plan(user_id).await?;

    fx.status.reconcile_user(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Inativo);
    assert_eq!(user.status, AccountStatus::Inactive);
    assert_eq!(user.current_plan_id, Some(fx.plan_id));

    Ok(())
}

#[tokio::test]
async fn recent_payment_keeps_user_ativo() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("em-dia@example.com").await?;
    fx.assign_plan(user_id).await?;
    fx.add_paid_payment(user_id, 10).await?;

    fx.status.reconcile_user(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Ativo);
    assert_eq!(user.status, AccountStatus::Active);

    Ok(())
}

#[tokio::test]
async fn payment_age_thresholds() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let cases = [
        (29, PlanStatus::Ativo),
        (30, PlanStatus::Atrasado),
        (59, PlanStatus::Atrasado),
        (60, PlanStatus::Inativo),
        (89, PlanStatus::Inativo),
    ];

    for (age, expected) in cases {
        let user_id = fx.create_user(&format!("age-{age}@example.com")).await?;
        fx.assign_plan(user_id).await?;
        fx.add_paid_payment(user_id, age).await?;

        fx.status.reconcile_user(user_id).await?;

        let user = fx.users.find_by_id(user_id).await?.unwrap();
        assert_eq!(user.plan_status, expected, "age {age} days");
    }

    Ok(())
}

#[tokio::test]
async fn lapsed_payment_drops_the_plan() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("sumiu@example.com").await?;
    fx.assign_plan(user_id).await?;
    fx.add_paid_payment(user_id, 95).await?;

    fx.status.reconcile_user(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.current_plan_id, None);
    assert_eq!(user.plan_status, PlanStatus::SemPlano);
    assert_eq!(user.status, AccountStatus::Inactive);
    assert!(user.plan_status_updated_at.is_some());

    Ok(())
}

#[tokio::test]
async fn reconciliation_is_idempotent() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("idempotente@example.com").await?;
    fx.assign_plan(user_id).await?;
    fx.add_paid_payment(user_id, 45).await?;

    fx.status.reconcile_user(user_id).await?;
    let first = fx.users.find_by_id(user_id).await?.unwrap();

    fx.status.reconcile_user(user_id).await?;
    let second = fx.users.find_by_id(user_id).await?.unwrap();

    assert_eq!(first.plan_status, second.plan_status);
    assert_eq!(first.status, second.status);
    assert_eq!(first.current_plan_id, second.current_plan_id);
    assert_eq!(first.plan_status_updated_at, second.plan_status_updated_at);

    Ok(())
}

#[tokio::test]
async fn cancel_requires_an_assigned_plan() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("sem-plano-cancel@example.com").await?;

    let err = fx.status.cancel_plan(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = fx.status.cancel_plan(9999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn reactivate_requires_cancelado() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("nao-cancelado@example.com").await?;
    fx.assign_plan(user_id).await?;
    fx.add_paid_payment(user_id, 5).await?;
    fx.status.reconcile_user(user_id).await?;

    let err = fx.status.reactivate_plan(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn cancel_and_reactivate_round_trip() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user_id = fx.create_user("cancelamento@example.com").await?;
    fx.assign_plan(user_id).await?;
    let payment_id = fx.add_paid_payment(user_id, 5).await?;
    fx.status.reconcile_user(user_id).await?;

    fx.status.cancel_plan(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Cancelado);
    // Cancelling keeps the plan assignment.
    assert_eq!(user.current_plan_id, Some(fx.plan_id));
    let payment = fx.payments.find_by_id(payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Canceled);

    // A reconciliation in between must not undo the cancellation.
    fx.status.reconcile_user(user_id).await?;
    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Cancelado);

    fx.status.reactivate_plan(user_id).await?;

    let user = fx.users.find_by_id(user_id).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Ativo);
    assert_eq!(user.status, AccountStatus::Active);
    let payment = fx.payments.find_by_id(payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);

    Ok(())
}

#[tokio::test]
async fn batch_reconcile_skips_poisoned_users() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let healthy_a = fx.create_user("a@example.com").await?;
    fx.assign_plan(healthy_a).await?;
    fx.add_paid_payment(healthy_a, 10).await?;

    let poisoned = fx.create_user("b@example.com").await?;
    fx.assign_plan(poisoned).await?;
    // A paid payment whose date is garbage; deriving this user's status
    // fails at decode time.
    sqlx::query(
        r#"
        INSERT INTO payments (user_id, plan_id, status, payment_date, due_date, created_at)
        VALUES (?, ?, 'pago', 'not-a-timestamp', 'not-a-timestamp', 'not-a-timestamp')
        "#,
    )
    .bind(poisoned)
    .bind(fx.plan_id)
    .execute(&fx.pool)
    .await?;

    let healthy_b = fx.create_user("c@example.com").await?;
    fx.assign_plan(healthy_b).await?;
    fx.add_paid_payment(healthy_b, 40).await?;

    let outcome = fx.status.reconcile_all().await?;
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.updated, 2);

    let user = fx.users.find_by_id(healthy_a).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Ativo);
    let user = fx.users.find_by_id(healthy_b).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Atrasado);

    Ok(())
}

#[tokio::test]
async fn repair_fixes_stuck_states() -> anyhow::Result<()> {
    let fx = fixture().await?;

    // Plan assigned but stuck in cancelado.
    let stuck = fx.create_user("preso@example.com").await?;
    fx.assign_plan(stuck).await?;
    fx.add_paid_payment(stuck, 5).await?;
    fx.status.reconcile_user(stuck).await?;
    fx.status.cancel_plan(stuck).await?;

    // No plan but marked ativo.
    let ghost = fx.create_user("fantasma@example.com").await?;
    sqlx::query("UPDATE users SET plan_status = 'ativo', status = 'active' WHERE id = ?")
        .bind(ghost)
        .execute(&fx.pool)
        .await?;

    let outcome = fx.status.repair_inconsistencies().await?;
    assert_eq!(outcome.reactivated, 1);
    assert_eq!(outcome.adjusted, 1);

    let user = fx.users.find_by_id(stuck).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Ativo);
    let user = fx.users.find_by_id(ghost).await?.unwrap();
    assert_eq!(user.plan_status, PlanStatus::Inativo);

    Ok(())
}
