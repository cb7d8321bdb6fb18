use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::visuals::image_client::ImageGenerator;
use crate::visuals::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Image model behind a trait so tests and alternative providers can swap in.
    pub images: Arc<dyn ImageGenerator>,
    /// Bucket that generated images are uploaded to.
    pub objects: Arc<dyn ObjectStore>,
    pub config: Config,
}
