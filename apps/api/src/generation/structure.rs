//! Structure Analyzer: classifies a post and recommends how many visuals it needs.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::{STRUCTURE_PROMPT_TEMPLATE, STRUCTURE_ROLE};
use crate::generation::visual_prompts::VisualStyle;
use crate::llm_client::prompts::json_system_prompt;
use crate::llm_client::{CompletionParams, LlmClient};

/// Upper bound the analysis prompt gives the model for carousel length.
pub const MAX_RECOMMENDED_VISUALS: u32 = 8;

const STRUCTURE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.3,
    max_tokens: 600,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    List,
    #[default]
    Tips,
    Story,
    Process,
    Quote,
    Announcement,
    Question,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::List => "list",
            ContentType::Tips => "tips",
            ContentType::Story => "story",
            ContentType::Process => "process",
            ContentType::Quote => "quote",
            ContentType::Announcement => "announcement",
            ContentType::Question => "question",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-shape classification returned by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalysis {
    pub content_type: ContentType,
    pub recommended_visual_count: u32,
    pub visual_breakdown: Vec<String>,
    pub visual_style_recommendation: VisualStyle,
    pub key_points: Vec<String>,
    pub primary_topic: String,
    pub estimated_credits: u32,
}

impl PostAnalysis {
    /// Clamps the recommendation to 1..=MAX_RECOMMENDED_VISUALS; one credit per visual.
    pub fn normalized(mut self) -> Self {
        let clamped = self
            .recommended_visual_count
            .clamp(1, MAX_RECOMMENDED_VISUALS);
        if clamped != self.recommended_visual_count {
            warn!(
                "Model recommended {} visuals, clamping to {}",
                self.recommended_visual_count, clamped
            );
        }
        self.recommended_visual_count = clamped;
        self.estimated_credits = clamped;
        self
    }
}

pub fn build_structure_prompt(post_content: &str) -> String {
    STRUCTURE_PROMPT_TEMPLATE.replace("{post_content}", post_content)
}

/// Runs structure analysis. Malformed model output is a `Parse` error; no repair.
pub async fn analyze_post_structure(
    llm: &LlmClient,
    post_content: &str,
) -> Result<PostAnalysis, AppError> {
    let system = json_system_prompt(STRUCTURE_ROLE);
    let prompt = build_structure_prompt(post_content);

    let analysis: PostAnalysis = llm.call_json(&system, &prompt, STRUCTURE_PARAMS).await?;
    let analysis = analysis.normalized();

    info!(
        "Structure analysis: content_type={}, recommended_visual_count={}",
        analysis.content_type, analysis.recommended_visual_count
    );
    Ok(analysis)
}
