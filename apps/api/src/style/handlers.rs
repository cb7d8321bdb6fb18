use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::style::UserStyleRow;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::style::analyzer::{analyze_style, confidence_score};
use crate::style::store::{delete_style, get_style, upsert_style};
use crate::style::validation::validate_samples;

#[derive(Debug, Deserialize)]
pub struct AnalyzeStyleRequest {
    pub user_id: Uuid,
    pub samples: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeStyleResponse {
    pub style: UserStyleRow,
    pub samples_used: usize,
}

/// POST /api/v1/styles/analyze
pub async fn handle_analyze_style(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeStyleRequest>,
) -> Result<Json<AnalyzeStyleResponse>, AppError> {
    let samples = validate_samples(&request.samples)?;
    let samples_used = samples.len();

    let analysis = analyze_style(&state.llm, samples).await?;
    let style = upsert_style(
        &state.db,
        request.user_id,
        &analysis,
        confidence_score(samples_used),
    )
    .await?;

    Ok(Json(AnalyzeStyleResponse {
        style,
        samples_used,
    }))
}

/// GET /api/v1/styles
pub async fn handle_get_style(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UserStyleRow>, AppError> {
    let style = get_style(&state.db, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No style for user {}", params.user_id)))?;
    Ok(Json(style))
}

/// DELETE /api/v1/styles
pub async fn handle_clear_style(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if !delete_style(&state.db, params.user_id).await? {
        return Err(AppError::NotFound(format!(
            "No style for user {}",
            params.user_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
