use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::domain::*;
use crate::error::Result;

pub mod checkin_repository;
pub mod payment_repository;
pub mod plan_repository;
pub mod staff_repository;
pub mod user_repository;

pub use checkin_repository::SqliteCheckinRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use plan_repository::SqlitePlanRepository;
pub use staff_repository::SqliteStaffRepository;
pub use user_repository::{NewUser, SqliteUserRepository, UserOverview};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_ids(&self) -> Result<Vec<i64>>;
    /// Listing view for the dashboard: user joined with its current plan
    /// and a summary of the most recent payment.
    async fn list_overview(&self) -> Result<Vec<UserOverview>>;
    async fn overview_by_id(&self, id: i64) -> Result<Option<UserOverview>>;
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<()>;
    /// Assign a plan inside a caller-supplied transaction.
    async fn set_plan_on(&self, conn: &mut SqliteConnection, user_id: i64, plan_id: i64)
        -> Result<()>;
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;
    async fn count_all(&self) -> Result<i64>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn create(&self, plan: CreatePlanRequest) -> Result<Plan>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Plan>>;
    async fn list(&self) -> Result<Vec<Plan>>;
    async fn update(&self, id: i64, plan: CreatePlanRequest) -> Result<Option<Plan>>;
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn count_all(&self) -> Result<i64>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_on(
        &self,
        conn: &mut SqliteConnection,
        payment: CreatePaymentRequest,
    ) -> Result<Payment>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>>;
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Payment>>;
    /// Most recent `pago` payment by payment date.
    async fn last_paid_by_user(&self, user_id: i64) -> Result<Option<Payment>>;
    /// Latest `pago` payment by due date; the check-in gate consults this.
    async fn latest_paid_by_due_date(&self, user_id: i64) -> Result<Option<Payment>>;
    async fn update_status(&self, id: i64, status: PaymentStatus) -> Result<Option<Payment>>;
    async fn count_paid_since(&self, since: DateTime<Utc>) -> Result<i64>;
    async fn count_active_payers(&self, now: DateTime<Utc>) -> Result<i64>;
    async fn count_delinquent_payers(&self, now: DateTime<Utc>) -> Result<i64>;
    async fn revenue_between(&self, start: NaiveDate, end: NaiveDate) -> Result<f64>;
    async fn monthly_revenue(&self, since: NaiveDate) -> Result<Vec<MonthlyRevenue>>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MonthlyRevenue {
    #[serde(rename = "mes")]
    pub month: String,
    #[serde(rename = "total_recebido")]
    pub total: f64,
}

#[async_trait]
pub trait CheckinRepository: Send + Sync {
    async fn create(&self, user_id: i64) -> Result<Checkin>;
    async fn stats_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<CheckinStats>;
    async fn daily_totals(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<DailyCheckinCount>>;
    async fn count_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64>;
    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64>;
}

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn create(&self, staff: CreateStaffRequest, password_hash: String) -> Result<StaffMember>;
    async fn find_by_id(&self, id: i64) -> Result<Option<StaffMember>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<StaffMember>>;
    async fn list(&self) -> Result<Vec<StaffMember>>;
    async fn update(&self, id: i64, update: UpdateStaffRequest, password_hash: Option<String>)
        -> Result<Option<StaffMember>>;
    async fn delete(&self, id: i64) -> Result<bool>;
}
