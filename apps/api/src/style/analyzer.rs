//! Style Analyzer: turns validated sample posts into a stored style descriptor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::json_system_prompt;
use crate::llm_client::{CompletionParams, LlmClient};
use crate::style::prompts::{STYLE_ANALYSIS_PROMPT_TEMPLATE, STYLE_ANALYSIS_ROLE};

const ANALYSIS_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.3,
    max_tokens: 1000,
};

const BASE_CONFIDENCE: f64 = 0.7;
const CONFIDENCE_PER_SAMPLE: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.95;

/// Structured summary of a user's writing style, as returned by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub tone: String,
    pub common_topics: Vec<String>,
    pub post_structure_preferences: Vec<String>,
    pub engagement_patterns: Vec<String>,
    pub writing_style_markers: Vec<String>,
    #[serde(default)]
    pub vocabulary_level: String,
    #[serde(default)]
    pub sentence_structure: String,
    #[serde(default)]
    pub use_of_emojis: String,
    #[serde(default)]
    pub call_to_action_style: String,
    #[serde(default)]
    pub personal_vs_professional: String,
}

/// The descriptor plus analysis metadata. Persisted as `user_styles.style_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleAnalysis {
    #[serde(flatten)]
    pub descriptor: StyleDescriptor,
    pub analyzed_posts: Vec<String>,
    pub posts_count: usize,
    pub analysis_date: DateTime<Utc>,
}

/// More samples give more confidence, capped at 0.95.
pub fn confidence_score(sample_count: usize) -> f64 {
    (BASE_CONFIDENCE + CONFIDENCE_PER_SAMPLE * sample_count as f64).min(MAX_CONFIDENCE)
}

pub fn build_analysis_prompt(samples: &[String]) -> String {
    let rendered = samples
        .iter()
        .enumerate()
        .map(|(i, post)| format!("Post {}:\n{}\n", i + 1, post))
        .collect::<Vec<_>>()
        .join("\n");
    STYLE_ANALYSIS_PROMPT_TEMPLATE.replace("{samples}", &rendered)
}

/// Sends already-validated samples to the LLM and returns the analysis.
pub async fn analyze_style(
    llm: &LlmClient,
    samples: Vec<String>,
) -> Result<StyleAnalysis, AppError> {
    let prompt = build_analysis_prompt(&samples);
    let system = json_system_prompt(STYLE_ANALYSIS_ROLE);

    let descriptor: StyleDescriptor = llm.call_json(&system, &prompt, ANALYSIS_PARAMS).await?;
    info!(
        "Style analysis completed over {} samples: tone={}",
        samples.len(),
        descriptor.tone
    );

    Ok(StyleAnalysis {
        descriptor,
        posts_count: samples.len(),
        analyzed_posts: samples,
        analysis_date: Utc::now(),
    })
}
