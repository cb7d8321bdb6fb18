//! Visual Prompt Generator: asks the LLM for one image prompt per carousel slide.
//!
//! Parsing is strict. A response that does not match the schema is not an error:
//! it degrades to a single keyword-chosen fallback prompt, and the caller is told
//! that the fallback was used.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::{VISUAL_PROMPTS_ROLE, VISUAL_PROMPTS_TEMPLATE};
use crate::generation::structure::{ContentType, PostAnalysis};
use crate::llm_client::prompts::json_system_prompt;
use crate::llm_client::{parse_structured, CompletionParams, LlmClient, ParseOutcome};

/// Largest batch a single request may ask for.
pub const MAX_VISUALS: u32 = 10;

const VISUAL_PROMPT_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.4,
    max_tokens: 1500,
};

/// Fallback titles, checked in priority order.
const FALLBACK_TOPICS: &[(&str, &str)] = &[
    ("sales", "Sales Success Strategies"),
    ("marketing", "Marketing Insights That Work"),
    ("leadership", "Leadership Lessons"),
    ("productivity", "Productivity Boosters"),
    ("networking", "Networking Essentials"),
];
const GENERIC_FALLBACK_TITLE: &str = "Key Professional Insights";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    Infographic,
    QuoteCards,
    #[default]
    Mixed,
}

impl VisualStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStyle::Infographic => "infographic",
            VisualStyle::QuoteCards => "quote_cards",
            VisualStyle::Mixed => "mixed",
        }
    }

    pub fn guidelines(&self) -> &'static str {
        match self {
            VisualStyle::Infographic => {
                "Clean, data-focused design with charts, icons, and structured layouts. \
                Professional color scheme with blues, whites, and accent colors. \
                Modern typography and clear information hierarchy."
            }
            VisualStyle::QuoteCards => {
                "Bold, eye-catching design focused on text. Minimal background elements, \
                strong typography, inspiring color gradients or solid backgrounds. \
                Emphasis on readability and impact."
            }
            VisualStyle::Mixed => {
                "Combination of infographic elements and quote card aesthetics. \
                Balanced visual hierarchy with both textual and graphical elements."
            }
        }
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slide's worth of instructions for the image model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualPrompt {
    #[serde(default)]
    pub order: u32,
    pub title: String,
    pub image_prompt: String,
    #[serde(default)]
    pub text_overlay: String,
    #[serde(default)]
    pub design_notes: String,
}

/// The model may wrap the array in `{"visualPrompts": [...]}` or return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptEnvelope {
    Wrapped {
        #[serde(rename = "visualPrompts")]
        visual_prompts: Vec<VisualPrompt>,
    },
    Bare(Vec<VisualPrompt>),
}

impl PromptEnvelope {
    fn into_prompts(self) -> Vec<VisualPrompt> {
        match self {
            PromptEnvelope::Wrapped { visual_prompts } => visual_prompts,
            PromptEnvelope::Bare(prompts) => prompts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisualPromptRequest {
    pub visual_count: u32,
    pub visual_style: VisualStyle,
    pub content_type: ContentType,
    pub analysis: Option<PostAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPrompts {
    pub prompts: Vec<VisualPrompt>,
    pub fallback_used: bool,
}

pub fn validate_visual_count(visual_count: u32) -> Result<(), AppError> {
    if visual_count == 0 || visual_count > MAX_VISUALS {
        return Err(AppError::Validation(format!(
            "visual_count must be between 1 and {MAX_VISUALS}, got {visual_count}"
        )));
    }
    Ok(())
}

/// Index of the first prompt without a title or image prompt.
fn first_incomplete(prompts: &[VisualPrompt]) -> Option<usize> {
    prompts
        .iter()
        .position(|p| p.title.trim().is_empty() || p.image_prompt.trim().is_empty())
}

/// Checks prompts supplied by a client with the same rules applied to model output.
pub fn validate_prompts(prompts: &[VisualPrompt]) -> Result<(), AppError> {
    if prompts.is_empty() {
        return Err(AppError::Validation(
            "Visual prompts are required for generation".to_string(),
        ));
    }
    validate_visual_count(u32::try_from(prompts.len()).unwrap_or(u32::MAX))?;
    if let Some(bad) = first_incomplete(prompts) {
        return Err(AppError::Validation(format!(
            "visual prompt {} is missing a title or imagePrompt",
            bad + 1
        )));
    }
    Ok(())
}

fn render_analysis_context(analysis: Option<&PostAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return String::new();
    };
    let mut context = format!("Primary Topic: {}\n", analysis.primary_topic);
    if !analysis.key_points.is_empty() {
        context.push_str(&format!("Key Points: {}\n", analysis.key_points.join("; ")));
    }
    if !analysis.visual_breakdown.is_empty() {
        context.push_str("Suggested Breakdown:\n");
        for (i, item) in analysis.visual_breakdown.iter().enumerate() {
            context.push_str(&format!("{}. {}\n", i + 1, item));
        }
    }
    context
}

pub fn build_visual_prompts_request(post_content: &str, request: &VisualPromptRequest) -> String {
    VISUAL_PROMPTS_TEMPLATE
        .replace("{visual_count}", &request.visual_count.to_string())
        .replace("{visual_style}", request.visual_style.as_str())
        .replace("{post_content}", post_content)
        .replace("{content_type}", request.content_type.as_str())
        .replace("{style_guidelines}", request.visual_style.guidelines())
        .replace(
            "{analysis_context}",
            &render_analysis_context(request.analysis.as_ref()),
        )
}

/// Strictly parses model output into at most `visual_count` prompts, renumbered 1..=N.
///
/// Empty lists and prompts without a title or image prompt are `Malformed`.
pub fn parse_visual_prompts(raw: &str, visual_count: u32) -> ParseOutcome<Vec<VisualPrompt>> {
    let prompts = match parse_structured::<PromptEnvelope>(raw) {
        ParseOutcome::Parsed(envelope) => envelope.into_prompts(),
        ParseOutcome::Malformed { raw, reason } => {
            return ParseOutcome::Malformed { raw, reason };
        }
    };

    if prompts.is_empty() {
        return ParseOutcome::Malformed {
            raw: raw.to_string(),
            reason: "response contained no visual prompts".to_string(),
        };
    }
    if let Some(bad) = first_incomplete(&prompts) {
        return ParseOutcome::Malformed {
            raw: raw.to_string(),
            reason: format!("visual prompt {} is missing a title or imagePrompt", bad + 1),
        };
    }

    let prompts = prompts
        .into_iter()
        .take(visual_count as usize)
        .enumerate()
        .map(|(i, prompt)| VisualPrompt {
            order: i as u32 + 1,
            ..prompt
        })
        .collect();
    ParseOutcome::Parsed(prompts)
}

/// Picks a title by the first priority keyword found in `text`.
pub fn fallback_title(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    FALLBACK_TOPICS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, title)| *title)
        .unwrap_or(GENERIC_FALLBACK_TITLE)
}

/// Builds the single generic prompt used when the model's response is unusable.
/// Keywords are looked for in the post first, then in the raw model output.
pub fn fallback_prompt(post_content: &str, raw_response: &str, style: VisualStyle) -> VisualPrompt {
    let title = fallback_title(&format!("{post_content}\n{raw_response}"));
    VisualPrompt {
        order: 1,
        title: title.to_string(),
        image_prompt: format!(
            "Professional LinkedIn {style} slide titled '{title}', clean modern layout, \
            bold headline typography, blue and white palette"
        ),
        text_overlay: title.to_string(),
        design_notes: style.guidelines().to_string(),
    }
}

/// Requests prompts for a post. Upstream failures are errors; malformed output
/// falls back to one generic prompt.
pub async fn generate_visual_prompts(
    llm: &LlmClient,
    post_content: &str,
    request: &VisualPromptRequest,
) -> Result<GeneratedPrompts, AppError> {
    validate_visual_count(request.visual_count)?;

    info!(
        "Generating {} visual prompts with {} style",
        request.visual_count, request.visual_style
    );

    let system = json_system_prompt(VISUAL_PROMPTS_ROLE);
    let user = build_visual_prompts_request(post_content, request);
    let raw = llm.complete(&system, &user, VISUAL_PROMPT_PARAMS).await?;

    match parse_visual_prompts(&raw, request.visual_count) {
        ParseOutcome::Parsed(prompts) => {
            if prompts.len() < request.visual_count as usize {
                warn!(
                    "Model returned {} visual prompts, {} requested",
                    prompts.len(),
                    request.visual_count
                );
            }
            Ok(GeneratedPrompts {
                prompts,
                fallback_used: false,
            })
        }
        ParseOutcome::Malformed { raw, reason } => {
            warn!("Visual prompt response unusable ({reason}); using keyword fallback");
            Ok(GeneratedPrompts {
                prompts: vec![fallback_prompt(post_content, &raw, request.visual_style)],
                fallback_used: true,
            })
        }
    }
}
