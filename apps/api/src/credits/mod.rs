//! Profiles and credits: balance checks, deductions, and the usage audit trail.

pub mod handlers;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, UsageRow};

pub const ACTION_VISUAL_GENERATION: &str = "visual_generation";
pub const ACTION_VISUAL_REGENERATION: &str = "visual_regeneration";

/// Creates the profile for `user_id` if it does not exist yet and returns it.
pub async fn create_profile(
    pool: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
    full_name: Option<&str>,
    starting_credits: i32,
) -> Result<ProfileRow, AppError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, email, full_name, credits_remaining)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(full_name)
    .bind(starting_credits)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("Created profile for user {user_id} with {starting_credits} credits");
    }

    get_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))
}

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Loads the profile and fails with `InsufficientCredits` if it cannot cover `required`.
pub async fn require_credits(
    pool: &PgPool,
    user_id: Uuid,
    required: i32,
) -> Result<ProfileRow, AppError> {
    let profile = get_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;
    check_balance(profile.credits_remaining, required)?;
    Ok(profile)
}

pub fn check_balance(available: i32, required: i32) -> Result<(), AppError> {
    if available < required {
        return Err(AppError::InsufficientCredits {
            required,
            available,
        });
    }
    Ok(())
}

/// Appends a usage row and decrements the balance. Two independent statements;
/// the balance never goes below zero.
pub async fn charge(
    pool: &PgPool,
    user_id: Uuid,
    action_type: &str,
    credits: i32,
) -> Result<(), AppError> {
    if credits <= 0 {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO usage_tracking (user_id, action_type, credits_used) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(action_type)
    .bind(credits)
    .execute(pool)
    .await?;

    let updated = sqlx::query(
        r#"
        UPDATE profiles
        SET credits_remaining = GREATEST(credits_remaining - $2, 0), updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(credits)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        warn!("Charged {credits} credits for {action_type} but user {user_id} has no profile");
    } else {
        info!("Charged {credits} credits to user {user_id} for {action_type}");
    }
    Ok(())
}

pub async fn list_usage(pool: &PgPool, user_id: Uuid) -> Result<Vec<UsageRow>, sqlx::Error> {
    sqlx::query_as::<_, UsageRow>(
        "SELECT * FROM usage_tracking WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
