//! Axum route handlers for profiles and credit usage.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credits::{create_profile, get_profile, list_usage};
use crate::errors::AppError;
use crate::models::profile::{ProfileRow, UsageRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub credits_remaining: i32,
    pub usage: Vec<UsageRow>,
}

/// POST /api/v1/profiles
///
/// Idempotent: returns the existing profile when one is already present.
pub async fn handle_create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = create_profile(
        &state.db,
        request.user_id,
        request.email.as_deref(),
        request.full_name.as_deref(),
        state.config.starting_credits,
    )
    .await?;
    Ok(Json(profile))
}

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;
    Ok(Json(profile))
}

/// GET /api/v1/profiles/:user_id/usage
pub async fn handle_get_usage(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UsageResponse>, AppError> {
    let profile = get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))?;
    let usage = list_usage(&state.db, user_id).await?;
    Ok(Json(UsageResponse {
        credits_remaining: profile.credits_remaining,
        usage,
    }))
}
