use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{CreatePlanRequest, Plan},
    error::{AppError, Result},
    repository::PlanRepository,
};

#[derive(FromRow)]
struct PlanRow {
    id: i64,
    name: String,
    description: String,
    price: f64,
    checkin_limit: i64,
    created_at: NaiveDateTime,
}

pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_plan(row: PlanRow) -> Plan {
        Plan {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            checkin_limit: row.checkin_limit,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        }
    }
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn create(&self, plan: CreatePlanRequest) -> Result<Plan> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO plans (name, description, price, checkin_limit, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price)
        .bind(plan.checkin_limit)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created plan".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, name, description, price, checkin_limit, created_at
            FROM plans
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_plan))
    }

    async fn list(&self) -> Result<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, name, description, price, checkin_limit, created_at
            FROM plans
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_plan).collect())
    }

    async fn update(&self, id: i64, plan: CreatePlanRequest) -> Result<Option<Plan>> {
        let result = sqlx::query(
            r#"
            UPDATE plans
            SET name = ?, description = ?, price = ?, checkin_limit = ?
            WHERE id = ?
            "#,
        )
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price)
        .bind(plan.checkin_limit)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM plans")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}
