use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::credits::require_credits;
use crate::errors::AppError;
use crate::generation::store::{get_post, stored_prompts};
use crate::generation::visual_prompts::{validate_prompts, VisualPrompt};
use crate::models::visual::VisualRow;
use crate::state::AppState;
use crate::visuals::job::{
    regenerate_visual, run_visual_job, VisualContext, VisualJobReport, VisualResult,
};
use crate::visuals::progress::{load_progress, BatchProgress};
use crate::visuals::store::{get_visual, job_exists, list_for_job, resolve_job_id};

#[derive(Debug, Deserialize)]
pub struct GenerateVisualsRequest {
    pub user_id: Uuid,
    /// Prompts to render. When absent, the prompts stored on the post are used.
    pub prompts: Option<Vec<VisualPrompt>>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateVisualRequest {
    pub user_id: Uuid,
    pub prompt: Option<String>,
}

/// Selects one batch of a post. The latest batch when `job_id` is absent.
#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BatchProgressResponse {
    /// `None` when the post has no visuals yet.
    pub job_id: Option<Uuid>,
    #[serde(flatten)]
    pub progress: BatchProgress,
}

fn visual_context(state: &AppState) -> VisualContext<'_> {
    VisualContext {
        records: &state.db,
        images: state.images.as_ref(),
        objects: state.objects.as_ref(),
        delay: Duration::from_millis(state.config.visual_generation_delay_ms),
    }
}

/// POST /api/v1/posts/:id/visuals
pub async fn handle_generate_visuals(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(request): Json<GenerateVisualsRequest>,
) -> Result<Json<VisualJobReport>, AppError> {
    if let Some(prompts) = &request.prompts {
        validate_prompts(prompts)?;
    }

    let post = get_post(&state.db, post_id, request.user_id).await?;
    let prompts = match request.prompts {
        Some(prompts) => prompts,
        None => {
            let stored = stored_prompts(&post)?;
            validate_prompts(&stored)?;
            stored
        }
    };

    require_credits(&state.db, request.user_id, prompts.len() as i32).await?;

    let job_id = request.job_id.unwrap_or_else(Uuid::new_v4);
    if request.job_id.is_some() && job_exists(&state.db, job_id).await? {
        return Err(AppError::Validation(format!(
            "job_id {job_id} has already been used"
        )));
    }
    info!(
        "Starting visual job {job_id} for post {post_id}: {} prompts",
        prompts.len()
    );

    let report = run_visual_job(
        &visual_context(&state),
        job_id,
        post_id,
        request.user_id,
        prompts,
    )
    .await?;
    Ok(Json(report))
}

/// GET /api/v1/posts/:id/visuals
pub async fn handle_list_visuals(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<BatchQuery>,
) -> Result<Json<Vec<VisualRow>>, AppError> {
    get_post(&state.db, post_id, params.user_id).await?;
    let job_id = resolve_job_id(&state.db, post_id, params.user_id, params.job_id).await?;
    let visuals = match job_id {
        Some(job_id) => list_for_job(&state.db, post_id, params.user_id, job_id).await?,
        None => Vec::new(),
    };
    Ok(Json(visuals))
}

/// GET /api/v1/posts/:id/visuals/progress
pub async fn handle_visual_progress(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<BatchQuery>,
) -> Result<Json<BatchProgressResponse>, AppError> {
    get_post(&state.db, post_id, params.user_id).await?;
    let job_id = resolve_job_id(&state.db, post_id, params.user_id, params.job_id).await?;
    let progress = match job_id {
        Some(job_id) => load_progress(&state.db, post_id, params.user_id, job_id).await?,
        None => BatchProgress::default(),
    };
    Ok(Json(BatchProgressResponse { job_id, progress }))
}

/// POST /api/v1/visuals/:id/regenerate
pub async fn handle_regenerate_visual(
    State(state): State<AppState>,
    Path(visual_id): Path<Uuid>,
    Json(request): Json<RegenerateVisualRequest>,
) -> Result<Json<VisualResult>, AppError> {
    let row = get_visual(&state.db, visual_id, request.user_id).await?;
    require_credits(&state.db, request.user_id, 1).await?;

    let result = regenerate_visual(&visual_context(&state), row, request.prompt).await?;
    Ok(Json(result))
}
