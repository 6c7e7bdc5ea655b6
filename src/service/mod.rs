pub mod status_service;
pub mod subscription_service;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{AuthService, ResetCodeStore};
use crate::repository::*;

pub use status_service::{BatchOutcome, RepairOutcome, StatusService};
pub use subscription_service::SubscriptionService;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub plan_repo: Arc<dyn PlanRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub checkin_repo: Arc<dyn CheckinRepository>,
    pub staff_repo: Arc<dyn StaffRepository>,
    pub status_service: Arc<StatusService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub auth_service: Arc<AuthService>,
    pub reset_codes: Arc<ResetCodeStore>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        plan_repo: Arc<dyn PlanRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        checkin_repo: Arc<dyn CheckinRepository>,
        staff_repo: Arc<dyn StaffRepository>,
        auth_service: Arc<AuthService>,
        db_pool: SqlitePool,
    ) -> Self {
        let status_service = Arc::new(StatusService::new(db_pool.clone()));
        let subscription_service = Arc::new(SubscriptionService::new(
            db_pool.clone(),
            user_repo.clone(),
            plan_repo.clone(),
            payment_repo.clone(),
            status_service.clone(),
        ));
        let reset_codes = Arc::new(ResetCodeStore::new(db_pool.clone()));

        Self {
            user_repo,
            plan_repo,
            payment_repo,
            checkin_repo,
            staff_repo,
            status_service,
            subscription_service,
            auth_service,
            reset_codes,
            db_pool,
        }
    }
}
