// Content pipeline: post generation, structure analysis, visual-prompt generation.
// All LLM calls go through llm_client; nothing here talks to the API directly.

pub mod handlers;
pub mod post;
pub mod prompts;
pub mod store;
pub mod structure;
pub mod visual_prompts;
