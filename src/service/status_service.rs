use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    domain::{derive_plan_state, AccountStatus, PaymentStatus, PlanStatus, StatusDecision},
    error::{AppError, Result},
};

/// Everything the derivation needs about one user, fetched in a single
/// query: plan assignment, current plan status, and the date of the most
/// recent `pago` payment.
#[derive(FromRow)]
struct ReconcileRow {
    current_plan_id: Option<i64>,
    plan_status: String,
    last_paid_at: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct BatchOutcome {
    #[serde(rename = "atualizados")]
    pub updated: usize,
    #[serde(rename = "falhas")]
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RepairOutcome {
    #[serde(rename = "reativados")]
    pub reactivated: u64,
    #[serde(rename = "ajustados")]
    pub adjusted: u64,
}

/// Derives and persists a user's subscription status from its payment
/// history. Single-user reconciliation is idempotent; batch mode shares
/// one transaction but tolerates per-user failure.
pub struct StatusService {
    pool: SqlitePool,
}

impl StatusService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn reconcile_user(&self, user_id: i64) -> Result<Option<StatusDecision>> {
        let mut conn = self.pool.acquire().await?;
        self.reconcile_user_on(&mut conn, user_id).await
    }

    /// Reconciles one user on a caller-supplied connection, so the writes
    /// join the caller's transaction when there is one. A missing user is
    /// not an error; there is simply nothing to reconcile.
    pub async fn reconcile_user_on(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<Option<StatusDecision>> {
        let row = sqlx::query_as::<_, ReconcileRow>(
            r#"
            SELECT
                u.current_plan_id,
                u.plan_status,
                (SELECT payment_date FROM payments
                 WHERE user_id = u.id AND status = ?
                 ORDER BY payment_date DESC
                 LIMIT 1) AS last_paid_at
            FROM users u
            WHERE u.id = ?
            "#,
        )
        .bind(PaymentStatus::Paid.as_str())
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let current = PlanStatus::parse(&row.plan_status).ok_or_else(|| {
            AppError::Database(format!("Invalid plan status: {}", row.plan_status))
        })?;

        let now = Utc::now();
        let age_days = row
            .last_paid_at
            .map(|paid_at| (now.naive_utc() - paid_at).num_days());

        let decision = derive_plan_state(row.current_plan_id.is_some(), age_days, current);

        if decision.clear_plan {
            sqlx::query(
                r#"
                UPDATE users
                SET current_plan_id = NULL, plan_status = ?, status = ?,
                    plan_status_updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(decision.plan_status.as_str())
            .bind(decision.account_status.as_str())
            .bind(now.naive_utc())
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        } else {
            sqlx::query("UPDATE users SET plan_status = ?, status = ? WHERE id = ?")
                .bind(decision.plan_status.as_str())
                .bind(decision.account_status.as_str())
                .bind(user_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(Some(decision))
    }

    /// Reconciles every user inside one transaction. A failure on one
    /// user is logged and skipped; the remaining users still get their
    /// updates and the transaction commits.
    pub async fn reconcile_all(&self) -> Result<BatchOutcome> {
        let mut tx = self.pool.begin().await?;

        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users ORDER BY id")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            match self.reconcile_user_on(&mut tx, id).await {
                Ok(_) => outcome.updated += 1,
                Err(e) => {
                    tracing::error!("Failed to reconcile user {}: {}", id, e);
                    outcome.failed += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Cancels the user's plan: marks the plan status `cancelado` and all
    /// currently-paid payments `cancelado`, keeping the plan assignment.
    /// Rolls back entirely if any step fails.
    pub async fn cancel_plan(&self, user_id: i64) -> Result<()> {
        let user = self.fetch_user_state(user_id).await?;

        if user.current_plan_id.is_none() {
            return Err(AppError::BadRequest(
                "Usuário não possui um plano ativo para cancelar".to_string(),
            ));
        }

        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET plan_status = ?, status = ?, plan_status_updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(PlanStatus::Cancelado.as_str())
        .bind(AccountStatus::Inactive.as_str())
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query("UPDATE payments SET status = ? WHERE user_id = ? AND status = ?")
            .bind(PaymentStatus::Canceled.as_str())
            .bind(user_id)
            .bind(PaymentStatus::Paid.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit().await?;
        Ok(())
    }

    /// Reactivates a cancelled plan: plan status back to `ativo`, account
    /// back to `active`, and the most recent payment flipped back to
    /// `pago`. Requires the plan to be `cancelado`.
    pub async fn reactivate_plan(&self, user_id: i64) -> Result<()> {
        let user = self.fetch_user_state(user_id).await?;

        if user.plan_status != PlanStatus::Cancelado.as_str() {
            return Err(AppError::BadRequest("Plano não está cancelado".to_string()));
        }

        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET plan_status = ?, status = ?, plan_status_updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(PlanStatus::Ativo.as_str())
        .bind(AccountStatus::Active.as_str())
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let last_payment_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM payments
            WHERE user_id = ?
            ORDER BY payment_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(payment_id) = last_payment_id {
            sqlx::query("UPDATE payments SET status = ? WHERE id = ?")
                .bind(PaymentStatus::Paid.as_str())
                .bind(payment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Coarse repair for stored states the reconciler cannot reach on its
    /// own: users holding a plan but stuck in `cancelado` become `ativo`,
    /// users with no plan but marked `ativo` become `inativo`. The next
    /// reconciliation converges them fully.
    pub async fn repair_inconsistencies(&self) -> Result<RepairOutcome> {
        let mut tx = self.pool.begin().await?;

        let reactivated = sqlx::query(
            r#"
            UPDATE users
            SET plan_status = ?, status = ?
            WHERE current_plan_id IS NOT NULL AND plan_status = ?
            "#,
        )
        .bind(PlanStatus::Ativo.as_str())
        .bind(AccountStatus::Active.as_str())
        .bind(PlanStatus::Cancelado.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected();

        let adjusted = sqlx::query(
            r#"
            UPDATE users
            SET plan_status = ?, status = ?
            WHERE current_plan_id IS NULL AND plan_status = ?
            "#,
        )
        .bind(PlanStatus::Inativo.as_str())
        .bind(AccountStatus::Inactive.as_str())
        .bind(PlanStatus::Ativo.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected();

        tx.commit().await?;

        Ok(RepairOutcome {
            reactivated,
            adjusted,
        })
    }

    async fn fetch_user_state(&self, user_id: i64) -> Result<UserStateRow> {
        sqlx::query_as::<_, UserStateRow>(
            "SELECT current_plan_id, plan_status FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))
    }
}

#[derive(FromRow)]
struct UserStateRow {
    current_plan_id: Option<i64>,
    plan_status: String,
}
