use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserStyleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub style_data: Value,
    pub confidence_score: f64,
    pub posts_analyzed: i32,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
