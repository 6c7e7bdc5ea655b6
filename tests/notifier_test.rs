use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use ferrofit::{
    config::NotifierConfig,
    notifier::{ChangeNotifier, EventKind},
    repository::{
        SqliteCheckinRepository, SqlitePaymentRepository, SqliteUserRepository,
    },
};

async fn setup() -> anyhow::Result<(SqlitePool, ChangeNotifier)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let notifier = ChangeNotifier::new(
        Arc::new(SqliteCheckinRepository::new(pool.clone())),
        Arc::new(SqlitePaymentRepository::new(pool.clone())),
        Arc::new(SqliteUserRepository::new(pool.clone())),
        &NotifierConfig {
            tick_seconds: 3,
            lookback_seconds: 5,
        },
    );

    Ok((pool, notifier))
}

/// Raw inserts with controlled timestamps, so a row can be placed inside
/// or outside the lookback window.
async fn insert_user(pool: &SqlitePool, email: &str, age_seconds: i64) -> anyhow::Result<i64> {
    let created_at = (Utc::now() - Duration::seconds(age_seconds)).naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, status, plan_status, created_at)
        VALUES ('Teste', ?, 'hash', 'pending', 'sem_plano', ?)
        "#,
    )
    .bind(email)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

async fn insert_plan(pool: &SqlitePool) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO plans (name, description, price, checkin_limit, created_at) \
         VALUES ('Mensal', '', 99.9, 0, ?)",
    )
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

async fn insert_checkin(pool: &SqlitePool, user_id: i64, age_seconds: i64) -> anyhow::Result<()> {
    let at = (Utc::now() - Duration::seconds(age_seconds)).naive_utc();
    sqlx::query("INSERT INTO checkins (user_id, checked_in_at) VALUES (?, ?)")
        .bind(user_id)
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

async fn insert_paid_payment(
    pool: &SqlitePool,
    user_id: i64,
    plan_id: i64,
    age_seconds: i64,
) -> anyhow::Result<()> {
    let at = (Utc::now() - Duration::seconds(age_seconds)).naive_utc();
    sqlx::query(
        r#"
        INSERT INTO payments (user_id, plan_id, status, payment_date, due_date, created_at)
        VALUES (?, ?, 'pago', ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .bind(at)
    .bind(at)
    .bind(at)
    .execute(pool)
    .await?;
    Ok(())
}

#[tokio::test]
async fn fresh_checkins_produce_one_event_with_count() -> anyhow::Result<()> {
    let (pool, notifier) = setup().await?;
    // The user predates the lookback window so only check-ins fire.
    let user_id = insert_user(&pool, "a@example.com", 3600).await?;
    insert_checkin(&pool, user_id, 2).await?;
    insert_checkin(&pool, user_id, 2).await?;

    let mut rx = notifier.subscribe();
    let events = notifier.poll_once().await?;

    let checkin_events: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::CheckinUpdate)
        .collect();
    assert_eq!(checkin_events.len(), 1);
    assert_eq!(checkin_events[0].data["count"], json!(2));

    // Subscribed clients receive the same event.
    let received = rx.try_recv()?;
    assert_eq!(received.kind, EventKind::CheckinUpdate);
    assert_eq!(received.data["count"], json!(2));

    Ok(())
}

#[tokio::test]
async fn rows_outside_the_lookback_are_silent() -> anyhow::Result<()> {
    let (pool, notifier) = setup().await?;
    let user_id = insert_user(&pool, "b@example.com", 3600).await?;
    insert_checkin(&pool, user_id, 60).await?;

    let events = notifier.poll_once().await?;
    assert!(events.is_empty());

    Ok(())
}

#[tokio::test]
async fn recent_payments_and_users_each_get_their_event() -> anyhow::Result<()> {
    let (pool, notifier) = setup().await?;
    let old_user = insert_user(&pool, "c@example.com", 3600).await?;
    let plan_id = insert_plan(&pool).await?;
    insert_paid_payment(&pool, old_user, plan_id, 2).await?;
    insert_user(&pool, "d@example.com", 1).await?;

    let events = notifier.poll_once().await?;

    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::PaymentUpdate));
    assert!(kinds.contains(&EventKind::UserUpdate));
    assert!(!kinds.contains(&EventKind::CheckinUpdate));

    Ok(())
}

#[tokio::test]
async fn unpaid_payments_do_not_fire() -> anyhow::Result<()> {
    let (pool, notifier) = setup().await?;
    let user_id = insert_user(&pool, "e@example.com", 3600).await?;
    let plan_id = insert_plan(&pool).await?;

    let at = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO payments (user_id, plan_id, status, payment_date, due_date, created_at)
        VALUES (?, ?, 'pendente', ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .bind(at)
    .bind(at)
    .bind(at)
    .execute(&pool)
    .await?;

    let events = notifier.poll_once().await?;
    assert!(events
        .iter()
        .all(|e| e.kind != EventKind::PaymentUpdate));

    Ok(())
}

#[tokio::test]
async fn connection_event_acknowledges_the_client() -> anyhow::Result<()> {
    let (_pool, notifier) = setup().await?;

    let ack = notifier.connection_event();
    assert_eq!(ack.kind, EventKind::Connection);
    assert!(!ack.message.is_empty());

    Ok(())
}

#[tokio::test]
async fn manual_updates_reach_subscribers() -> anyhow::Result<()> {
    let (_pool, notifier) = setup().await?;

    let mut rx = notifier.subscribe();
    notifier.notify_manual("Status atualizados em lote");

    let event = rx.try_recv()?;
    assert_eq!(event.kind, EventKind::ManualUpdate);
    assert_eq!(event.message, "Status atualizados em lote");

    Ok(())
}
