//! Post Generator: one completion call turns a topic (plus optional stored style)
//! into post text, which is stored verbatim.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::prompts::{POST_PROMPT_TEMPLATE, POST_SYSTEM_GENERIC, POST_SYSTEM_PERSONAL};
use crate::generation::store::insert_post;
use crate::llm_client::{CompletionParams, LlmClient};
use crate::style::analyzer::StyleDescriptor;
use crate::style::store::get_descriptor;

pub const STRUCTURE_GENERIC: &str = "generic_tips";
pub const STRUCTURE_PERSONAL: &str = "personal_experience";

const POST_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.7,
    max_tokens: 800,
};

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePostRequest {
    pub user_id: Uuid,
    pub prompt: String,
    #[serde(default)]
    pub use_personal_style: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratePostResponse {
    pub post_id: Uuid,
    pub generated_content: String,
    pub post_structure: String,
    pub prompt: String,
}

/// A fully assembled system + user prompt pair and the structure tag it implies.
#[derive(Debug, Clone)]
pub struct PostPrompt {
    pub system: &'static str,
    pub user: String,
    pub structure: &'static str,
}

/// Renders the stored style as a bullet block for the post prompt.
pub fn render_style_context(style: &StyleDescriptor) -> String {
    let mut block = String::from("\nUser's Writing Style Profile:\n");
    block.push_str(&format!("- Tone: {}\n", style.tone));
    block.push_str(&format!("- Common Topics: {}\n", style.common_topics.join(", ")));
    block.push_str(&format!(
        "- Structure Preferences: {}\n",
        style.post_structure_preferences.join(", ")
    ));
    block.push_str(&format!(
        "- Engagement Patterns: {}\n",
        style.engagement_patterns.join(", ")
    ));
    block.push_str(&format!(
        "- Style Markers: {}\n",
        style.writing_style_markers.join(", ")
    ));
    for (label, value) in [
        ("Vocabulary Level", &style.vocabulary_level),
        ("Emoji Usage", &style.use_of_emojis),
        ("Call to Action Style", &style.call_to_action_style),
    ] {
        if !value.is_empty() {
            block.push_str(&format!("- {label}: {value}\n"));
        }
    }
    block
}

/// Builds the prompt pair. A style is applied only when one is supplied.
pub fn build_post_prompt(topic: &str, style: Option<&StyleDescriptor>) -> PostPrompt {
    let Some(style) = style else {
        return PostPrompt {
            system: POST_SYSTEM_GENERIC,
            user: POST_PROMPT_TEMPLATE
                .replace("{topic}", topic)
                .replace("{style_context}", "")
                .replace("{tone_clause}", "")
                .replace("{emoji_clause}", "")
                .replace("{mirror_rule}", ""),
            structure: STRUCTURE_GENERIC,
        };
    };

    let emoji_clause = if style.use_of_emojis.is_empty() {
        ""
    } else {
        " (match the user's emoji style)"
    };

    PostPrompt {
        system: POST_SYSTEM_PERSONAL,
        user: POST_PROMPT_TEMPLATE
            .replace("{topic}", topic)
            .replace("{style_context}", &render_style_context(style))
            .replace("{tone_clause}", " that matches the user's style above")
            .replace("{emoji_clause}", emoji_clause)
            .replace(
                "{mirror_rule}",
                "- Mirror the user's tone, vocabulary level, and engagement style\n",
            ),
        structure: STRUCTURE_PERSONAL,
    }
}

/// Generates a post and persists it. Returns the stored row's id and content.
pub async fn generate_post(
    pool: &PgPool,
    llm: &LlmClient,
    request: GeneratePostRequest,
) -> Result<GeneratePostResponse, AppError> {
    let topic = request.prompt.trim();
    if topic.is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let style = if request.use_personal_style {
        get_descriptor(pool, request.user_id).await?
    } else {
        None
    };

    info!(
        "Generating post for user {} (personal style: {}): {:?}",
        request.user_id,
        style.is_some(),
        topic.chars().take(50).collect::<String>()
    );

    let prompt = build_post_prompt(topic, style.as_ref());
    let content = llm.complete(prompt.system, &prompt.user, POST_PARAMS).await?;

    let post_id = insert_post(pool, request.user_id, topic, &content, prompt.structure).await?;
    info!("Stored post {post_id} for user {}", request.user_id);

    Ok(GeneratePostResponse {
        post_id,
        generated_content: content,
        post_structure: prompt.structure.to_string(),
        prompt: topic.to_string(),
    })
}
