use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::visual_prompts::{VisualPrompt, VisualStyle};
use crate::models::post::{PostRow, POST_SELECT};

/// Inserts a generated post. Blank content is rejected before it reaches the table.
pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    original_prompt: &str,
    generated_content: &str,
    post_structure: &str,
) -> Result<Uuid, AppError> {
    if generated_content.trim().is_empty() {
        return Err(AppError::Llm(
            "Refusing to store a post with empty generated content".to_string(),
        ));
    }

    let post_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO generated_posts (user_id, original_prompt, generated_content, post_structure)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(original_prompt)
    .bind(generated_content)
    .bind(post_structure)
    .fetch_one(pool)
    .await?;

    Ok(post_id)
}

/// Loads a post owned by `user_id`, or `NotFound`.
pub async fn get_post(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<PostRow, AppError> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1 AND p.user_id = $2"))
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))
}

pub async fn list_posts(pool: &PgPool, user_id: Uuid) -> Result<Vec<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!(
        "{POST_SELECT} WHERE p.user_id = $1 ORDER BY p.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Deletes a post and, through the foreign key, its visuals.
pub async fn delete_post(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM generated_posts WHERE id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}

/// Stores the latest visual prompts and chosen style on the post.
pub async fn save_visual_prompts(
    pool: &PgPool,
    post_id: Uuid,
    style: VisualStyle,
    prompts: &[VisualPrompt],
) -> Result<(), AppError> {
    let prompts_json = serde_json::to_value(prompts)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize prompts: {e}")))?;

    sqlx::query(
        r#"
        UPDATE generated_posts
        SET visual_prompts = $2, visual_style = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .bind(&prompts_json)
    .bind(style.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Reads the prompts previously stored on a post, if any.
pub fn stored_prompts(post: &PostRow) -> Result<Vec<VisualPrompt>, AppError> {
    match &post.visual_prompts {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Stored visual prompts for post {} are unreadable: {e}",
                post.id
            ))
        }),
    }
}
