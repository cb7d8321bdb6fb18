// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting pieces.

/// Sentence appended to every system prompt whose response must be JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Joins a role description with the JSON-only instruction.
pub fn json_system_prompt(role: &str) -> String {
    format!("{role} {JSON_ONLY_INSTRUCTION}")
}
