use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "cargo")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "Senha deve ter ao menos 6 caracteres"))]
    pub password: String,
    #[serde(rename = "cargo")]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateStaffRequest {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "senha")]
    pub password: Option<String>,
    #[serde(rename = "cargo")]
    pub role: Option<String>,
}
