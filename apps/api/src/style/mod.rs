// Style analysis: learns a user's writing style from pasted sample posts.
// Samples are validated here, analyzed by the LLM, and upserted per user.

pub mod analyzer;
pub mod handlers;
pub mod prompts;
pub mod store;
pub mod validation;
