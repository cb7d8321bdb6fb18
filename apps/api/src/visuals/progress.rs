//! Batch progress, derived from the live row statuses on every read.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::visual::VisualStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub generating: u32,
    /// Completed share of the batch, rounded to the nearest percent.
    pub percent: u32,
    /// True once every row has reached a terminal status.
    pub finished: bool,
}

impl BatchProgress {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = VisualStatus>,
    {
        let mut progress = BatchProgress::default();
        for status in statuses {
            progress.total += 1;
            match status {
                VisualStatus::Generating => progress.generating += 1,
                VisualStatus::Completed => progress.completed += 1,
                VisualStatus::Failed => progress.failed += 1,
            }
        }
        if progress.total > 0 {
            progress.percent = (progress.completed * 100 + progress.total / 2) / progress.total;
        }
        progress.finished = progress.total > 0 && progress.generating == 0;
        progress
    }
}

/// Progress of one batch of a post.
pub async fn load_progress(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<BatchProgress, sqlx::Error> {
    let statuses: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT status FROM generated_visuals
        WHERE post_id = $1 AND user_id = $2 AND job_id = $3
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(BatchProgress::from_statuses(
        statuses
            .iter()
            .map(|s| s.parse().unwrap_or(VisualStatus::Generating)),
    ))
}
