use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "preco")]
    pub price: f64,
    #[serde(rename = "limite_checkins")]
    pub checkin_limit: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, message = "Nome do plano é obrigatório"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0, message = "Preço não pode ser negativo"))]
    pub price: f64,
    #[serde(default)]
    pub checkin_limit: i64,
}
