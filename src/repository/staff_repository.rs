use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{CreateStaffRequest, StaffMember, UpdateStaffRequest},
    error::{AppError, Result},
    repository::StaffRepository,
};

#[derive(FromRow)]
struct StaffRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: NaiveDateTime,
}

pub struct SqliteStaffRepository {
    pool: SqlitePool,
}

impl SqliteStaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_staff(row: StaffRow) -> StaffMember {
        StaffMember {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        }
    }
}

#[async_trait]
impl StaffRepository for SqliteStaffRepository {
    async fn create(&self, staff: CreateStaffRequest, password_hash: String) -> Result<StaffMember> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO staff (name, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&staff.name)
        .bind(&staff.email)
        .bind(&password_hash)
        .bind(&staff.role)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created staff member".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StaffMember>> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM staff
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_staff))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StaffMember>> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM staff
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_staff))
    }

    async fn list(&self) -> Result<Vec<StaffMember>> {
        let rows = sqlx::query_as::<_, StaffRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM staff
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_staff).collect())
    }

    async fn update(
        &self,
        id: i64,
        update: UpdateStaffRequest,
        password_hash: Option<String>,
    ) -> Result<Option<StaffMember>> {
        let result = sqlx::query(
            r#"
            UPDATE staff
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role)
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(&password_hash)
        .bind(&update.role)
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
        let result = sqlx::query("DELETE FROM staff WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
