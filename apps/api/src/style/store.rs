use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::style::UserStyleRow;
use crate::style::analyzer::{StyleAnalysis, StyleDescriptor};

/// Inserts or replaces the style for a user. One row per user.
pub async fn upsert_style(
    pool: &PgPool,
    user_id: Uuid,
    analysis: &StyleAnalysis,
    confidence_score: f64,
) -> Result<UserStyleRow, AppError> {
    let style_data = serde_json::to_value(analysis)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize style: {e}")))?;

    let row = sqlx::query_as::<_, UserStyleRow>(
        r#"
        INSERT INTO user_styles
            (user_id, style_data, confidence_score, posts_analyzed, last_updated)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (user_id) DO UPDATE
        SET style_data = EXCLUDED.style_data,
            confidence_score = EXCLUDED.confidence_score,
            posts_analyzed = EXCLUDED.posts_analyzed,
            last_updated = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&style_data)
    .bind(confidence_score)
    .bind(analysis.posts_count as i32)
    .fetch_one(pool)
    .await?;

    info!("Stored style for user {user_id} (confidence {confidence_score:.2})");
    Ok(row)
}

pub async fn get_style(pool: &PgPool, user_id: Uuid) -> Result<Option<UserStyleRow>, sqlx::Error> {
    sqlx::query_as::<_, UserStyleRow>("SELECT * FROM user_styles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Loads only the descriptor part of a stored style, if one parses.
pub async fn get_descriptor(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<StyleDescriptor>, sqlx::Error> {
    let Some(row) = get_style(pool, user_id).await? else {
        return Ok(None);
    };
    match serde_json::from_value::<StyleDescriptor>(row.style_data) {
        Ok(descriptor) => Ok(Some(descriptor)),
        Err(e) => {
            warn!("Stored style for user {user_id} is unreadable, ignoring: {e}");
            Ok(None)
        }
    }
}

/// Deletes the user's style. Returns whether a row existed.
pub async fn delete_style(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM user_styles WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}
