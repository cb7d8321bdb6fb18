// LLM prompt templates for style analysis.

/// Role description for the style analysis system prompt.
pub const STYLE_ANALYSIS_ROLE: &str = "You are an expert content analyst who specializes in \
    identifying writing patterns and styles in LinkedIn posts.";

/// Style analysis prompt template. Replace `{samples}` before sending.
pub const STYLE_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze these LinkedIn posts and extract detailed writing patterns.

Return a JSON object with this EXACT schema:
{
  "tone": "overall tone, e.g. professional, casual, inspirational, humorous",
  "common_topics": ["frequent topics or themes"],
  "post_structure_preferences": ["preferred structures such as lists, stories, tips, questions"],
  "engagement_patterns": ["engagement techniques used"],
  "writing_style_markers": ["unique style characteristics"],
  "vocabulary_level": "complexity of the vocabulary",
  "sentence_structure": "typical sentence patterns",
  "use_of_emojis": "frequency and style of emoji usage",
  "call_to_action_style": "how the author typically engages the audience",
  "personal_vs_professional": "balance between personal stories and professional content"
}

POSTS TO ANALYZE:
{samples}"#;
