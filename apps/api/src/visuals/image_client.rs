//! Image generation: pluggable, trait-based client for the image model.
//!
//! Default: `GeminiImageGenerator` (Gemini `generateContent` with image output).
//! `AppState` holds an `Arc<dyn ImageGenerator>`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::generation::visual_prompts::VisualPrompt;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The image model used for all visuals.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response contained no image data")]
    NoImage,

    #[error("Image base64 decode failed: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Raw image bytes plus the MIME type reported by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// The image generator trait. Implement this to swap providers without touching
/// the job runner or handlers.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError>;
}

/// Flattens a slide prompt into the single text prompt the image model receives.
pub fn compose_image_prompt(prompt: &VisualPrompt) -> String {
    let mut text = prompt.image_prompt.trim().to_string();
    if !prompt.text_overlay.trim().is_empty() {
        text.push_str(&format!(
            "\nText overlay: \"{}\"",
            prompt.text_overlay.trim()
        ));
    }
    if !prompt.design_notes.trim().is_empty() {
        text.push_str(&format!("\nDesign notes: {}", prompt.design_notes.trim()));
    }
    text.push_str("\nSquare 1080x1080 professional LinkedIn carousel slide.");
    text
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(alias = "inline_data")]
    inline_data: Option<InlineData>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Returns the first inline image in the response, decoded.
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, ImageError> {
    let parts = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts);

    for part in parts {
        if let Some(inline) = part.inline_data.filter(|d| !d.data.is_empty()) {
            let bytes = BASE64.decode(inline.data.as_bytes())?;
            return Ok(GeneratedImage {
                bytes: Bytes::from(bytes),
                mime_type: inline.mime_type,
            });
        }
        if let Some(text) = part.text {
            debug!("Image model returned text part: {text}");
        }
    }

    Err(ImageError::NoImage)
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiImageGenerator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiImageGenerator {
    client: Client,
    api_key: String,
}

impl GeminiImageGenerator {
    pub fn new(api_key: String) -> Result<Self, ImageError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        let response = self
            .client
            .post(format!(
                "{GEMINI_API_BASE}/models/{IMAGE_MODEL}:generateContent"
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Image API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ImageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        extract_image(payload)
    }
}
