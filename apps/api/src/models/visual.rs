use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a single visual: `Generating → Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualStatus {
    Generating,
    Completed,
    Failed,
}

impl VisualStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStatus::Generating => "generating",
            VisualStatus::Completed => "completed",
            VisualStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VisualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(VisualStatus::Generating),
            "completed" => Ok(VisualStatus::Completed),
            "failed" => Ok(VisualStatus::Failed),
            other => Err(format!("unknown visual status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VisualRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    /// Batch that created the row.
    pub job_id: Uuid,
    pub prompt_used: String,
    pub title: String,
    pub text_overlay: String,
    pub generation_order: i32,
    pub image_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
