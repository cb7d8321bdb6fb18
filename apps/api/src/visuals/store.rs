use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::credits::charge;
use crate::errors::AppError;
use crate::generation::visual_prompts::VisualPrompt;
use crate::models::visual::{VisualRow, VisualStatus};

/// Where the job runner records row state and credit charges.
/// `PgPool` is the production implementation.
#[async_trait]
pub trait VisualRecorder: Send + Sync {
    async fn create_batch(
        &self,
        job_id: Uuid,
        post_id: Uuid,
        user_id: Uuid,
        prompts: &[VisualPrompt],
    ) -> Result<Vec<VisualRow>, AppError>;

    async fn record_completed(&self, visual_id: Uuid, image_url: &str) -> Result<(), AppError>;

    async fn record_failed(&self, visual_id: Uuid, error_message: &str) -> Result<(), AppError>;

    async fn record_regenerating(&self, visual_id: Uuid, prompt_used: &str)
        -> Result<(), AppError>;

    async fn charge(&self, user_id: Uuid, action_type: &str, credits: i32)
        -> Result<(), AppError>;
}

#[async_trait]
impl VisualRecorder for PgPool {
    async fn create_batch(
        &self,
        job_id: Uuid,
        post_id: Uuid,
        user_id: Uuid,
        prompts: &[VisualPrompt],
    ) -> Result<Vec<VisualRow>, AppError> {
        Ok(insert_batch(self, job_id, post_id, user_id, prompts).await?)
    }

    async fn record_completed(&self, visual_id: Uuid, image_url: &str) -> Result<(), AppError> {
        Ok(mark_completed(self, visual_id, image_url).await?)
    }

    async fn record_failed(&self, visual_id: Uuid, error_message: &str) -> Result<(), AppError> {
        Ok(mark_failed(self, visual_id, error_message).await?)
    }

    async fn record_regenerating(
        &self,
        visual_id: Uuid,
        prompt_used: &str,
    ) -> Result<(), AppError> {
        Ok(mark_regenerating(self, visual_id, prompt_used).await?)
    }

    async fn charge(
        &self,
        user_id: Uuid,
        action_type: &str,
        credits: i32,
    ) -> Result<(), AppError> {
        charge(self, user_id, action_type, credits).await
    }
}

/// Inserts one `generating` row per prompt in a single statement, all tagged
/// with `job_id`. Rows come back sorted by `generation_order`.
pub async fn insert_batch(
    pool: &PgPool,
    job_id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    prompts: &[VisualPrompt],
) -> Result<Vec<VisualRow>, sqlx::Error> {
    let image_prompts: Vec<&str> = prompts.iter().map(|p| p.image_prompt.as_str()).collect();
    let titles: Vec<&str> = prompts.iter().map(|p| p.title.as_str()).collect();
    let overlays: Vec<&str> = prompts.iter().map(|p| p.text_overlay.as_str()).collect();
    let orders: Vec<i32> = prompts.iter().map(|p| p.order as i32).collect();

    let mut rows = sqlx::query_as::<_, VisualRow>(
        r#"
        INSERT INTO generated_visuals
            (post_id, user_id, job_id, prompt_used, title, text_overlay, generation_order, status)
        SELECT $1, $2, $3, t.prompt_used, t.title, t.text_overlay, t.generation_order, $8
        FROM UNNEST($4::text[], $5::text[], $6::text[], $7::int4[])
            AS t(prompt_used, title, text_overlay, generation_order)
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(job_id)
    .bind(&image_prompts)
    .bind(&titles)
    .bind(&overlays)
    .bind(&orders)
    .bind(VisualStatus::Generating.as_str())
    .fetch_all(pool)
    .await?;

    rows.sort_by_key(|r| r.generation_order);
    Ok(rows)
}

pub async fn mark_completed(
    pool: &PgPool,
    visual_id: Uuid,
    image_url: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE generated_visuals
        SET status = $2, image_url = $3, error_message = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(visual_id)
    .bind(VisualStatus::Completed.as_str())
    .bind(image_url)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(
    pool: &PgPool,
    visual_id: Uuid,
    error_message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE generated_visuals
        SET status = $2, error_message = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(visual_id)
    .bind(VisualStatus::Failed.as_str())
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Resets a visual to `generating` for a regeneration, optionally with a new prompt.
pub async fn mark_regenerating(
    pool: &PgPool,
    visual_id: Uuid,
    prompt_used: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE generated_visuals
        SET status = $2, prompt_used = $3, error_message = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(visual_id)
    .bind(VisualStatus::Generating.as_str())
    .bind(prompt_used)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_visual(
    pool: &PgPool,
    visual_id: Uuid,
    user_id: Uuid,
) -> Result<VisualRow, AppError> {
    sqlx::query_as::<_, VisualRow>(
        "SELECT * FROM generated_visuals WHERE id = $1 AND user_id = $2",
    )
    .bind(visual_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Visual {visual_id} not found")))
}

/// True when any row already carries `job_id`.
pub async fn job_exists(pool: &PgPool, job_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM generated_visuals WHERE job_id = $1)")
        .bind(job_id)
        .fetch_one(pool)
        .await
}

/// The batch whose rows were created most recently for the post.
pub async fn latest_job_id(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT job_id FROM generated_visuals
        WHERE post_id = $1 AND user_id = $2
        ORDER BY created_at DESC, generation_order DESC
        LIMIT 1
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Resolves the batch to read: the requested one, else the post's latest.
pub async fn resolve_job_id(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, sqlx::Error> {
    match requested {
        Some(job_id) => Ok(Some(job_id)),
        None => latest_job_id(pool, post_id, user_id).await,
    }
}

pub async fn list_for_job(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<VisualRow>, sqlx::Error> {
    sqlx::query_as::<_, VisualRow>(
        r#"
        SELECT * FROM generated_visuals
        WHERE post_id = $1 AND user_id = $2 AND job_id = $3
        ORDER BY generation_order, created_at
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(job_id)
    .fetch_all(pool)
    .await
}

/// Visuals of the post's latest batch, or none if it has never had one.
pub async fn list_latest_batch(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<VisualRow>, sqlx::Error> {
    match latest_job_id(pool, post_id, user_id).await? {
        Some(job_id) => list_for_job(pool, post_id, user_id, job_id).await,
        None => Ok(Vec::new()),
    }
}
