use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkin {
    pub id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    #[serde(rename = "data_checkin")]
    pub checked_in_at: DateTime<Utc>,
}

/// Daily/weekly/monthly visit counts for one user.
#[derive(Debug, Clone, Serialize)]
pub struct CheckinStats {
    #[serde(rename = "diarios")]
    pub daily: i64,
    #[serde(rename = "semanais")]
    pub weekly: i64,
    #[serde(rename = "mensais")]
    pub monthly: i64,
}

/// Total check-ins for one calendar day, used by the dashboard chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyCheckinCount {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    pub total: i64,
}
