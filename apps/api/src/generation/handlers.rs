//! Axum route handlers for posts: generation, CRUD, structure analysis, visual prompts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::post::{generate_post, GeneratePostRequest, GeneratePostResponse};
use crate::generation::store::{delete_post, get_post, list_posts, save_visual_prompts};
use crate::generation::structure::{analyze_post_structure, ContentType, PostAnalysis};
use crate::generation::visual_prompts::{
    generate_visual_prompts, validate_visual_count, GeneratedPrompts, VisualPromptRequest,
    VisualStyle,
};
use crate::models::post::PostRow;
use crate::models::visual::VisualRow;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::visuals::store::list_latest_batch;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzePostRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VisualPromptsRequest {
    pub user_id: Uuid,
    pub visual_count: u32,
    #[serde(default)]
    pub visual_style: VisualStyle,
    /// Defaults to the analysis' content type, else `tips`.
    pub content_type: Option<ContentType>,
    pub analysis: Option<PostAnalysis>,
}

impl VisualPromptsRequest {
    fn into_prompt_request(self) -> VisualPromptRequest {
        let content_type = self
            .content_type
            .or_else(|| self.analysis.as_ref().map(|a| a.content_type))
            .unwrap_or_default();
        VisualPromptRequest {
            visual_count: self.visual_count,
            visual_style: self.visual_style,
            content_type,
            analysis: self.analysis,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostRow,
    pub visuals: Vec<VisualRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/posts/generate
pub async fn handle_generate_post(
    State(state): State<AppState>,
    Json(request): Json<GeneratePostRequest>,
) -> Result<Json<GeneratePostResponse>, AppError> {
    let response = generate_post(&state.db, &state.llm, request).await?;
    Ok(Json(response))
}

/// GET /api/v1/posts
pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<PostRow>>, AppError> {
    let posts = list_posts(&state.db, params.user_id).await?;
    Ok(Json(posts))
}

/// GET /api/v1/posts/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let post = get_post(&state.db, post_id, params.user_id).await?;
    let visuals = list_latest_batch(&state.db, post_id, params.user_id).await?;
    Ok(Json(PostDetailResponse { post, visuals }))
}

/// DELETE /api/v1/posts/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if !delete_post(&state.db, post_id, params.user_id).await? {
        return Err(AppError::NotFound(format!("Post {post_id} not found")));
    }
    info!("Deleted post {post_id} for user {}", params.user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/posts/:id/analyze
pub async fn handle_analyze_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(request): Json<AnalyzePostRequest>,
) -> Result<Json<PostAnalysis>, AppError> {
    let post = get_post(&state.db, post_id, request.user_id).await?;
    let analysis = analyze_post_structure(&state.llm, &post.generated_content).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/posts/:id/visual-prompts
///
/// Stores the resulting prompts and style on the post for the visual generator.
pub async fn handle_visual_prompts(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(request): Json<VisualPromptsRequest>,
) -> Result<Json<GeneratedPrompts>, AppError> {
    validate_visual_count(request.visual_count)?;

    let post = get_post(&state.db, post_id, request.user_id).await?;
    let prompt_request = request.into_prompt_request();

    let generated =
        generate_visual_prompts(&state.llm, &post.generated_content, &prompt_request).await?;
    save_visual_prompts(
        &state.db,
        post_id,
        prompt_request.visual_style,
        &generated.prompts,
    )
    .await?;

    Ok(Json(generated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_falls_back_to_analysis_then_tips() {
        let bare: VisualPromptsRequest = serde_json::from_value(json!({
            "user_id": Uuid::new_v4(),
            "visual_count": 3
        }))
        .unwrap();
        let bare = bare.into_prompt_request();
        assert_eq!(bare.content_type, ContentType::Tips);
        assert_eq!(bare.visual_style, VisualStyle::Mixed);

        let with_analysis: VisualPromptsRequest = serde_json::from_value(json!({
            "user_id": Uuid::new_v4(),
            "visual_count": 3,
            "visual_style": "quote_cards",
            "analysis": {
                "content_type": "story",
                "recommended_visual_count": 3,
                "visual_breakdown": [],
                "visual_style_recommendation": "quote_cards",
                "key_points": [],
                "primary_topic": "career change",
                "estimated_credits": 3
            }
        }))
        .unwrap();
        let with_analysis = with_analysis.into_prompt_request();
        assert_eq!(with_analysis.content_type, ContentType::Story);
        assert_eq!(with_analysis.visual_style, VisualStyle::QuoteCards);
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let request: VisualPromptsRequest = serde_json::from_value(json!({
            "user_id": Uuid::new_v4(),
            "visual_count": 2,
            "content_type": "process"
        }))
        .unwrap();
        assert_eq!(request.into_prompt_request().content_type, ContentType::Process);
    }
}
