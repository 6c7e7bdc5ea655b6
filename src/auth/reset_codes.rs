use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, Result};

/// How long a recovery code stays valid.
const CODE_TTL_MINUTES: i64 = 15;

#[derive(FromRow)]
struct CodeRow {
    code: String,
    expires_at: NaiveDateTime,
}

/// Password-recovery codes, persisted so they survive restarts and
/// expire instead of accumulating. One pending code per email; issuing
/// a new one replaces the old.
pub struct ResetCodeStore {
    pool: SqlitePool,
}

impl ResetCodeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn issue(&self, email: &str) -> Result<String> {
        let code = format!("{:06}", rand::thread_rng().gen_range(100_000..1_000_000));
        let now = Utc::now();
        let expires_at = now + Duration::minutes(CODE_TTL_MINUTES);

        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (email, code, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                code = excluded.code,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(email)
        .bind(&code)
        .bind(expires_at.naive_utc())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(code)
    }

    /// Checks the code for an email and consumes it on success. Expired
    /// rows are deleted on the way.
    pub async fn verify_and_consume(&self, email: &str, code: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, CodeRow>(
            "SELECT code, expires_at FROM password_reset_codes WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(false);
        };

        if row.expires_at <= Utc::now().naive_utc() {
            self.delete(email).await?;
            return Ok(false);
        }

        if row.code != code {
            return Ok(false);
        }

        self.delete(email).await?;
        Ok(true)
    }

    async fn delete(&self, email: &str) -> Result<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
