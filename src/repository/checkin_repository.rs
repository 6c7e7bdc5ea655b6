use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Checkin, CheckinStats, DailyCheckinCount},
    error::{AppError, Result},
    repository::CheckinRepository,
};

#[derive(FromRow)]
struct CheckinRow {
    id: i64,
    user_id: i64,
    checked_in_at: NaiveDateTime,
}

pub struct SqliteCheckinRepository {
    pool: SqlitePool,
}

impl SqliteCheckinRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count_for_user_since(&self, user_id: i64, since: NaiveDateTime) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM checkins WHERE user_id = ? AND checked_in_at >= ?",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[async_trait]
impl CheckinRepository for SqliteCheckinRepository {
    async fn create(&self, user_id: i64) -> Result<Checkin> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query("INSERT INTO checkins (user_id, checked_in_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, CheckinRow>(
            "SELECT id, user_id, checked_in_at FROM checkins WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Checkin {
            id: row.id,
            user_id: row.user_id,
            checked_in_at: DateTime::from_naive_utc_and_offset(row.checked_in_at, Utc),
        })
    }

    async fn stats_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<CheckinStats> {
        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time");

        let daily = self.count_for_user_since(user_id, today).await?;
        let weekly = self
            .count_for_user_since(user_id, today - Duration::days(7))
            .await?;
        let monthly = self
            .count_for_user_since(user_id, today - Duration::days(30))
            .await?;

        Ok(CheckinStats {
            daily,
            weekly,
            monthly,
        })
    }

    async fn daily_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCheckinCount>> {
        #[derive(FromRow)]
        struct DayRow {
            day: String,
            total: i64,
        }

        let rows = sqlx::query_as::<_, DayRow>(
            r#"
            SELECT date(checked_in_at) AS day, COUNT(*) AS total
            FROM checkins
            WHERE date(checked_in_at) BETWEEN date(?) AND date(?)
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_day: HashMap<NaiveDate, i64> = HashMap::new();
        for row in rows {
            let date = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d")
                .map_err(|e| AppError::Database(format!("Invalid day from group-by: {}", e)))?;
            by_day.insert(date, row.total);
        }

        // Fill every day of the range so the chart has no holes.
        let mut totals = Vec::new();
        let mut day = start;
        while day <= end {
            totals.push(DailyCheckinCount {
                date: day,
                total: by_day.get(&day).copied().unwrap_or(0),
            });
            day += Duration::days(1);
        }

        Ok(totals)
    }

    async fn count_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM checkins WHERE date(checked_in_at) BETWEEN date(?) AND date(?)",
        )
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM checkins WHERE checked_in_at > ?",
        )
        .bind(since.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}
