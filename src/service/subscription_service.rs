use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    domain::{CreatePaymentRequest, Payment},
    error::{AppError, Result},
    repository::{PaymentRepository, PlanRepository, UserRepository},
    service::StatusService,
};

/// Records a subscription payment: payment row, plan assignment, and the
/// resulting status, all inside one transaction.
pub struct SubscriptionService {
    pool: SqlitePool,
    user_repo: Arc<dyn UserRepository>,
    plan_repo: Arc<dyn PlanRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    status_service: Arc<StatusService>,
}

impl SubscriptionService {
    pub fn new(
        pool: SqlitePool,
        user_repo: Arc<dyn UserRepository>,
        plan_repo: Arc<dyn PlanRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        status_service: Arc<StatusService>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            plan_repo,
            payment_repo,
            status_service,
        }
    }

    pub async fn save_subscription(&self, request: CreatePaymentRequest) -> Result<Payment> {
        if self.user_repo.find_by_id(request.user_id).await?.is_none() {
            return Err(AppError::NotFound("Usuário não encontrado".to_string()));
        }
        if self.plan_repo.find_by_id(request.plan_id).await?.is_none() {
            return Err(AppError::NotFound("Plano não encontrado".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let payment = self.payment_repo.create_on(&mut tx, request.clone()).await?;
        self.user_repo
            .set_plan_on(&mut tx, request.user_id, request.plan_id)
            .await?;
        self.status_service
            .reconcile_user_on(&mut tx, request.user_id)
            .await?;

        tx.commit().await?;
        Ok(payment)
    }
}
