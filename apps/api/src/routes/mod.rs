pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::credits::handlers as credits;
use crate::generation::handlers as posts;
use crate::state::AppState;
use crate::style::handlers as styles;
use crate::visuals::handlers as visuals;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Style API
        .route("/api/v1/styles/analyze", post(styles::handle_analyze_style))
        .route(
            "/api/v1/styles",
            get(styles::handle_get_style).delete(styles::handle_clear_style),
        )
        // Posts API
        .route("/api/v1/posts/generate", post(posts::handle_generate_post))
        .route("/api/v1/posts", get(posts::handle_list_posts))
        .route(
            "/api/v1/posts/:id",
            get(posts::handle_get_post).delete(posts::handle_delete_post),
        )
        .route("/api/v1/posts/:id/analyze", post(posts::handle_analyze_post))
        .route(
            "/api/v1/posts/:id/visual-prompts",
            post(posts::handle_visual_prompts),
        )
        // Visuals API
        .route(
            "/api/v1/posts/:id/visuals",
            get(visuals::handle_list_visuals).post(visuals::handle_generate_visuals),
        )
        .route(
            "/api/v1/posts/:id/visuals/progress",
            get(visuals::handle_visual_progress),
        )
        .route(
            "/api/v1/visuals/:id/regenerate",
            post(visuals::handle_regenerate_visual),
        )
        // Profiles API
        .route("/api/v1/profiles", post(credits::handle_create_profile))
        .route("/api/v1/profiles/:user_id", get(credits::handle_get_profile))
        .route(
            "/api/v1/profiles/:user_id/usage",
            get(credits::handle_get_usage),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::LlmClient;
    use crate::visuals::image_client::{GeneratedImage, ImageError, ImageGenerator};
    use crate::visuals::storage::{ObjectStore, StorageError};

    struct NoImages;

    #[async_trait]
    impl ImageGenerator for NoImages {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, ImageError> {
            Err(ImageError::NoImage)
        }
    }

    struct NoObjects;

    #[async_trait]
    impl ObjectStore for NoObjects {
        async fn put_image(
            &self,
            key: &str,
            _image: &GeneratedImage,
        ) -> Result<String, StorageError> {
            Err(StorageError {
                key: key.to_string(),
                message: "no bucket in tests".to_string(),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: "postgres://postforge@127.0.0.1:1/postforge".to_string(),
            s3_bucket: "visuals".to_string(),
            s3_endpoint: "http://127.0.0.1:1".to_string(),
            s3_public_url: "http://127.0.0.1:1".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            openai_api_key: "test".to_string(),
            openai_base_url: "http://127.0.0.1:1".to_string(),
            gemini_api_key: "test".to_string(),
            visual_generation_delay_ms: 0,
            starting_credits: 10,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// Router over a pool that never connects. Only paths that fail before
    /// touching the database can be exercised.
    fn test_router() -> Router {
        let config = test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())
            .unwrap();
        build_router(AppState {
            db,
            llm,
            images: Arc::new(NoImages),
            objects: Arc::new(NoObjects),
            config,
        })
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn sample(topic: &str) -> String {
        format!("Here is a long enough LinkedIn post about {topic}, with a few lines of detail.")
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_style_analysis_rejects_too_few_samples() {
        let (status, body) = post_json(
            "/api/v1/styles/analyze",
            json!({
                "user_id": Uuid::new_v4(),
                "samples": [sample("sales"), sample("hiring")]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_generate_post_rejects_blank_prompt() {
        let (status, body) = post_json(
            "/api/v1/posts/generate",
            json!({ "user_id": Uuid::new_v4(), "prompt": "   " }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_visual_prompts_reject_out_of_range_count() {
        let uri = format!("/api/v1/posts/{}/visual-prompts", Uuid::new_v4());
        for count in [0, 11] {
            let (status, body) = post_json(
                &uri,
                json!({ "user_id": Uuid::new_v4(), "visual_count": count }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_visual_generation_rejects_empty_prompt_list() {
        let uri = format!("/api/v1/posts/{}/visuals", Uuid::new_v4());
        let (status, body) = post_json(
            &uri,
            json!({ "user_id": Uuid::new_v4(), "prompts": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    fn slide(order: u32, title: &str) -> Value {
        json!({
            "order": order,
            "title": title,
            "imagePrompt": format!("Minimal infographic slide {order}")
        })
    }

    #[tokio::test]
    async fn test_visual_generation_rejects_eleven_client_prompts() {
        let uri = format!("/api/v1/posts/{}/visuals", Uuid::new_v4());
        let prompts: Vec<Value> = (1..=11).map(|n| slide(n, "Slide")).collect();
        let (status, body) = post_json(
            &uri,
            json!({ "user_id": Uuid::new_v4(), "prompts": prompts }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_visual_generation_rejects_blank_client_title() {
        let uri = format!("/api/v1/posts/{}/visuals", Uuid::new_v4());
        let (status, body) = post_json(
            &uri,
            json!({ "user_id": Uuid::new_v4(), "prompts": [slide(1, "Hook"), slide(2, "  ")] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("visual prompt 2"));
    }
}
