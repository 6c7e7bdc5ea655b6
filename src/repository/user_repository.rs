use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    domain::{AccountStatus, PlanStatus, User},
    error::{AppError, Result},
    repository::UserRepository,
};

/// Insert payload; the caller is responsible for hashing the password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

// Database row struct that matches the SQLite schema
#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    status: String,
    current_plan_id: Option<i64>,
    plan_status: String,
    plan_status_updated_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

/// Listing row for the dashboard: the user plus its current plan and the
/// most recent payment summary, in the field names the frontend reads.
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct UserOverview {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "usuario_status")]
    pub status: String,
    #[serde(rename = "plano_atual_id")]
    pub current_plan_id: Option<i64>,
    #[serde(rename = "status_plano")]
    pub plan_status: String,
    #[serde(rename = "data_atualizacao_plano")]
    pub plan_status_updated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    #[serde(rename = "plano_nome")]
    pub plan_name: Option<String>,
    #[serde(rename = "plano_descricao")]
    pub plan_description: Option<String>,
    #[serde(rename = "preco_plano")]
    pub plan_price: Option<f64>,
    #[serde(rename = "status_pagamento")]
    pub last_payment_status: Option<String>,
    #[serde(rename = "data_ultimo_pagamento")]
    pub last_payment_date: Option<NaiveDateTime>,
}

const OVERVIEW_SELECT: &str = r#"
    SELECT
        u.id,
        u.name,
        u.email,
        u.status,
        u.current_plan_id,
        u.plan_status,
        u.plan_status_updated_at,
        u.created_at,
        p.name AS plan_name,
        p.description AS plan_description,
        p.price AS plan_price,
        (SELECT status FROM payments
         WHERE user_id = u.id
         ORDER BY payment_date DESC
         LIMIT 1) AS last_payment_status,
        (SELECT payment_date FROM payments
         WHERE user_id = u.id
         ORDER BY payment_date DESC
         LIMIT 1) AS last_payment_date
    FROM users u
    LEFT JOIN plans p ON u.current_plan_id = p.id
"#;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            status: AccountStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid account status: {}", row.status)))?,
            current_plan_id: row.current_plan_id,
            plan_status: PlanStatus::parse(&row.plan_status).ok_or_else(|| {
                AppError::Database(format!("Invalid plan status: {}", row.plan_status))
            })?,
            plan_status_updated_at: row
                .plan_status_updated_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, status, plan_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(AccountStatus::Pending.as_str())
        .bind(PlanStatus::SemPlano.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created user".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, status, current_plan_id,
                   plan_status, plan_status_updated_at, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, status, current_plan_id,
                   plan_status, plan_status_updated_at, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn list_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ids)
    }

    async fn list_overview(&self) -> Result<Vec<UserOverview>> {
        let sql = format!("{OVERVIEW_SELECT} ORDER BY u.created_at DESC");
        let rows = sqlx::query_as::<_, UserOverview>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows)
    }

    async fn overview_by_id(&self, id: i64) -> Result<Option<UserOverview>> {
        let sql = format!("{OVERVIEW_SELECT} WHERE u.id = ?");
        let row = sqlx::query_as::<_, UserOverview>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn set_plan_on(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        plan_id: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET current_plan_id = ? WHERE id = ?")
            .bind(plan_id)
            .bind(user_id)
            .execute(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE created_at > ?")
            .bind(since.naive_utc())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}
