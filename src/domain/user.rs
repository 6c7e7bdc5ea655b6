use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: AccountStatus,
    pub current_plan_id: Option<i64>,
    pub plan_status: PlanStatus,
    pub plan_status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Account-level status. The wire strings are the ones the dashboard was
/// built against: `pending`, `active` and `inativo`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "inativo")]
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inativo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            "inativo" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }

    /// The account status mirrored from a plan status. This is the only
    /// place the two fields are tied together; `Pending` exists only
    /// between registration and the first reconciliation.
    pub fn for_plan_status(plan_status: PlanStatus) -> Self {
        match plan_status {
            PlanStatus::Ativo => AccountStatus::Active,
            _ => AccountStatus::Inactive,
        }
    }
}

/// Derived subscription state of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    SemPlano,
    Inativo,
    Atrasado,
    Ativo,
    Cancelado,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::SemPlano => "sem_plano",
            PlanStatus::Inativo => "inativo",
            PlanStatus::Atrasado => "atrasado",
            PlanStatus::Ativo => "ativo",
            PlanStatus::Cancelado => "cancelado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sem_plano" => Some(PlanStatus::SemPlano),
            "inativo" => Some(PlanStatus::Inativo),
            "atrasado" => Some(PlanStatus::Atrasado),
            "ativo" => Some(PlanStatus::Ativo),
            "cancelado" => Some(PlanStatus::Cancelado),
            _ => None,
        }
    }
}

/// Outcome of the pure status derivation: the statuses to store and
/// whether the user's plan assignment must be cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDecision {
    pub plan_status: PlanStatus,
    pub account_status: AccountStatus,
    pub clear_plan: bool,
}

/// Pure transition function for the subscription state machine.
///
/// `last_paid_age_days` is the floor of whole days elapsed since the most
/// recent payment with status `pago`, or `None` if the user never paid.
/// `Cancelado` is sticky: only the explicit reactivate and repair
/// operations leave it. A user without a plan is `sem_plano` no matter
/// what the payment history says.
pub fn derive_plan_state(
    plan_assigned: bool,
    last_paid_age_days: Option<i64>,
    current: PlanStatus,
) -> StatusDecision {
    if !plan_assigned {
        return decision(PlanStatus::SemPlano, false);
    }

    if current == PlanStatus::Cancelado {
        return decision(PlanStatus::Cancelado, false);
    }

    match last_paid_age_days {
        None => decision(PlanStatus::Inativo, false),
        Some(age) if age < 30 => decision(PlanStatus::Ativo, false),
        Some(age) if age < 60 => decision(PlanStatus::Atrasado, false),
        Some(age) if age < 90 => decision(PlanStatus::Inativo, false),
        // 90 days or more without payment drops the plan entirely.
        Some(_) => decision(PlanStatus::SemPlano, true),
    }
}

fn decision(plan_status: PlanStatus, clear_plan: bool) -> StatusDecision {
    StatusDecision {
        plan_status,
        account_status: AccountStatus::for_plan_status(plan_status),
        clear_plan,
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "Senha deve ter ao menos 6 caracteres"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(plan: bool, age: Option<i64>) -> StatusDecision {
        derive_plan_state(plan, age, PlanStatus::Inativo)
    }

    #[test]
    fn no_plan_is_sem_plano_regardless_of_history() {
        for age in [None, Some(0), Some(45), Some(400)] {
            let d = state(false, age);
            assert_eq!(d.plan_status, PlanStatus::SemPlano);
            assert_eq!(d.account_status, AccountStatus::Inactive);
            assert!(!d.clear_plan);
        }
    }

    #[test]
    fn never_paid_is_inativo() {
        let d = state(true, None);
        assert_eq!(d.plan_status, PlanStatus::Inativo);
        assert_eq!(d.account_status, AccountStatus::Inactive);
    }

    #[test]
    fn thirty_day_boundary() {
        assert_eq!(state(true, Some(29)).plan_status, PlanStatus::Ativo);
        assert_eq!(state(true, Some(29)).account_status, AccountStatus::Active);
        assert_eq!(state(true, Some(30)).plan_status, PlanStatus::Atrasado);
        assert_eq!(state(true, Some(30)).account_status, AccountStatus::Inactive);
    }

    #[test]
    fn sixty_day_boundary() {
        assert_eq!(state(true, Some(59)).plan_status, PlanStatus::Atrasado);
        assert_eq!(state(true, Some(60)).plan_status, PlanStatus::Inativo);
    }

    #[test]
    fn ninety_day_boundary_drops_plan() {
        assert_eq!(state(true, Some(89)).plan_status, PlanStatus::Inativo);
        assert!(!state(true, Some(89)).clear_plan);

        let d = state(true, Some(90));
        assert_eq!(d.plan_status, PlanStatus::SemPlano);
        assert!(d.clear_plan);
    }

    #[test]
    fn cancelado_is_sticky_while_plan_assigned() {
        let d = derive_plan_state(true, Some(5), PlanStatus::Cancelado);
        assert_eq!(d.plan_status, PlanStatus::Cancelado);
        assert_eq!(d.account_status, AccountStatus::Inactive);
        assert!(!d.clear_plan);
    }
}
