use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list for reading posts. `visual_count` is derived on every read: the
/// completed visuals of the post's latest batch. It is never stored.
pub const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.original_prompt, p.generated_content, p.post_structure,
           p.visual_style, p.visual_prompts, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM generated_visuals v
            WHERE v.post_id = p.id
              AND v.status = 'completed'
              AND v.job_id = (SELECT l.job_id FROM generated_visuals l
                              WHERE l.post_id = p.id
                              ORDER BY l.created_at DESC, l.generation_order DESC
                              LIMIT 1)) AS visual_count
    FROM generated_posts p
"#;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_prompt: String,
    pub generated_content: String,
    pub post_structure: String,
    pub visual_style: Option<String>,
    pub visual_prompts: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub visual_count: i64,
}
