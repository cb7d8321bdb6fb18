// All LLM prompt constants for the generation pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

// ────────────────────────────────────────────────────────────────────────────
// Post generation
// ────────────────────────────────────────────────────────────────────────────

/// System prompt when no personal style is applied.
pub const POST_SYSTEM_GENERIC: &str = "You are a professional LinkedIn content creator. \
    Create engaging, professional LinkedIn posts that drive engagement and provide value.";

/// System prompt when the user's stored style is applied.
pub const POST_SYSTEM_PERSONAL: &str = "You are a LinkedIn content creator who writes in the \
    user's specific style. Create engaging LinkedIn posts that match the user's writing \
    patterns exactly.";

/// Post prompt template.
/// Replace: {topic}, {style_context}, {tone_clause}, {emoji_clause}, {mirror_rule}
pub const POST_PROMPT_TEMPLATE: &str = r#"Create a LinkedIn post about: "{topic}"
{style_context}
Requirements:
- Write in an engaging, professional tone{tone_clause}
- Include relevant emojis where appropriate{emoji_clause}
- Add appropriate hashtags (3-5 relevant hashtags)
- Make it 150-300 words
- Include a call-to-action question or engagement prompt
- Structure the content for readability (use line breaks, bullet points if needed)
{mirror_rule}
Return only the post content, ready to be published on LinkedIn."#;

// ────────────────────────────────────────────────────────────────────────────
// Structure analysis
// ────────────────────────────────────────────────────────────────────────────

pub const STRUCTURE_ROLE: &str = "You are an expert visual content strategist. Analyze \
    content and recommend optimal visual breakdowns for LinkedIn carousels.";

/// Structure analysis prompt template. Replace `{post_content}` before sending.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Analyze this LinkedIn post and determine the optimal visual strategy.

Return a JSON object with this EXACT schema:
{
  "content_type": "list" | "tips" | "story" | "process" | "quote" | "announcement" | "question",
  "recommended_visual_count": 4,
  "visual_breakdown": ["one description per visual"],
  "visual_style_recommendation": "infographic" | "quote_cards" | "mixed",
  "key_points": ["main points to visualize"],
  "primary_topic": "the main topic",
  "estimated_credits": 4
}

Guidelines:
- List or tips format: 1 intro visual + 1 per tip (max 8 total)
- Story: 3-5 key moment visuals
- Single concept or quote: 1-2 visuals
- Process: 1 per step + an overview
- estimated_credits must equal recommended_visual_count

POST CONTENT:
"{post_content}""#;

// ────────────────────────────────────────────────────────────────────────────
// Visual prompt generation
// ────────────────────────────────────────────────────────────────────────────

pub const VISUAL_PROMPTS_ROLE: &str = "You are an expert visual designer who creates detailed \
    prompts for AI image generation. Focus on LinkedIn-appropriate professional designs.";

/// Visual prompt request template.
/// Replace: {visual_count}, {visual_style}, {post_content}, {content_type},
///          {style_guidelines}, {analysis_context}
pub const VISUAL_PROMPTS_TEMPLATE: &str = r#"Create {visual_count} detailed visual prompts for {visual_style} style LinkedIn carousel images based on this post.

POST CONTENT:
"{post_content}"

Content Type: {content_type}
Visual Style: {visual_style}
Style Guidelines: {style_guidelines}
{analysis_context}
Return a JSON object with this EXACT schema:
{
  "visualPrompts": [
    {
      "order": 1,
      "title": "brief title for this visual",
      "imagePrompt": "detailed prompt for the image generation model",
      "textOverlay": "main text to overlay on the image",
      "designNotes": "specific design instructions"
    }
  ]
}

Guidelines for image prompts:
- Be specific about design style, colors, layout
- Include relevant icons, charts, or graphics based on content
- Specify text placement and hierarchy
- Mention a professional LinkedIn aesthetic
- Keep each imagePrompt under 200 characters
- The first visual is an eye-catching intro/title slide
- Subsequent visuals cover individual points, tips, or steps
- Return exactly {visual_count} objects"#;
