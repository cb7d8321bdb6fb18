use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub credits_remaining: i32,
    pub subscription_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit row written for every credit-consuming action.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
}
