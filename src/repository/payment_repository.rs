use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    domain::{CreatePaymentRequest, Payment, PaymentStatus},
    error::{AppError, Result},
    repository::{MonthlyRevenue, PaymentRepository},
};

#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    user_id: i64,
    plan_id: i64,
    status: String,
    payment_date: NaiveDateTime,
    due_date: NaiveDateTime,
    gateway_charge_id: Option<String>,
    created_at: NaiveDateTime,
}

const PAYMENT_SELECT: &str = r#"
    SELECT id, user_id, plan_id, status, payment_date, due_date,
           gateway_charge_id, created_at
    FROM payments
"#;

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            status: PaymentStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?,
            payment_date: DateTime::from_naive_utc_and_offset(row.payment_date, Utc),
            due_date: DateTime::from_naive_utc_and_offset(row.due_date, Utc),
            gateway_charge_id: row.gateway_charge_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create_on(
        &self,
        conn: &mut SqliteConnection,
        payment: CreatePaymentRequest,
    ) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payments (user_id, plan_id, status, payment_date, due_date,
                                  gateway_charge_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.plan_id)
        .bind(payment.status.as_str())
        .bind(payment.payment_date.naive_utc())
        .bind(payment.due_date.naive_utc())
        .bind(&payment.gateway_charge_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let sql = format!("{PAYMENT_SELECT} WHERE id = ?");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_payment(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let sql = format!("{PAYMENT_SELECT} WHERE id = ?");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Payment>> {
        let sql = format!("{PAYMENT_SELECT} WHERE user_id = ? ORDER BY payment_date DESC");
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn last_paid_by_user(&self, user_id: i64) -> Result<Option<Payment>> {
        let sql = format!(
            "{PAYMENT_SELECT} WHERE user_id = ? AND status = ? ORDER BY payment_date DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(user_id)
            .bind(PaymentStatus::Paid.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn latest_paid_by_due_date(&self, user_id: i64) -> Result<Option<Payment>> {
        let sql = format!(
            "{PAYMENT_SELECT} WHERE user_id = ? AND status = ? ORDER BY due_date DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(user_id)
            .bind(PaymentStatus::Paid.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: i64, status: PaymentStatus) -> Result<Option<Payment>> {
        let result = sqlx::query("UPDATE payments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn count_paid_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments WHERE payment_date > ? AND status = ?",
        )
        .bind(since.naive_utc())
        .bind(PaymentStatus::Paid.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn count_active_payers(&self, now: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT user_id) FROM payments
            WHERE status = ? AND due_date >= ?
            "#,
        )
        .bind(PaymentStatus::Paid.as_str())
        .bind(now.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn count_delinquent_payers(&self, now: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id) FROM payments WHERE due_date < ?",
        )
        .bind(now.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn revenue_between(&self, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        // The dashboard sends calendar dates; the range is inclusive of
        // the whole end day.
        let total = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(pl.price), 0.0)
            FROM payments p
            JOIN plans pl ON pl.id = p.plan_id
            WHERE p.status = ?
              AND date(p.payment_date) BETWEEN date(?) AND date(?)
            "#,
        )
        .bind(PaymentStatus::Paid.as_str())
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(total)
    }

    async fn monthly_revenue(&self, since: NaiveDate) -> Result<Vec<MonthlyRevenue>> {
        #[derive(FromRow)]
        struct MonthRow {
            month: String,
            total: f64,
        }

        let rows = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT strftime('%Y-%m', p.payment_date) AS month,
                   COALESCE(SUM(pl.price), 0.0) AS total
            FROM payments p
            JOIN plans pl ON pl.id = p.plan_id
            WHERE p.status = ? AND date(p.payment_date) >= date(?)
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(PaymentStatus::Paid.as_str())
        .bind(since.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| MonthlyRevenue {
                month: r.month,
                total: r.total,
            })
            .collect())
    }
}
