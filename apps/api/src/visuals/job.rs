//! Visual generation job: turns a batch of slide prompts into stored images.
//!
//! Flow: insert N `generating` rows → for each prompt, sequentially:
//!       image model → object store → row `completed` (or `failed`) →
//!       charge credits for what completed → report.
//!
//! A failed visual never aborts the batch. Every row ends `completed` or `failed`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::credits::{ACTION_VISUAL_GENERATION, ACTION_VISUAL_REGENERATION};
use crate::errors::AppError;
use crate::generation::visual_prompts::VisualPrompt;
use crate::models::visual::{VisualRow, VisualStatus};
use crate::visuals::image_client::{compose_image_prompt, ImageError, ImageGenerator};
use crate::visuals::storage::{object_key, ObjectStore, StorageError};
use crate::visuals::store::VisualRecorder;

/// Everything a job needs, passed explicitly by the caller.
pub struct VisualContext<'a> {
    pub records: &'a dyn VisualRecorder,
    pub images: &'a dyn ImageGenerator,
    pub objects: &'a dyn ObjectStore,
    /// Pause between consecutive image calls within one batch.
    pub delay: Duration,
}

#[derive(Debug, Error)]
pub enum VisualError {
    #[error("image generation failed: {0}")]
    Image(#[from] ImageError),

    #[error("upload failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<VisualError> for AppError {
    fn from(err: VisualError) -> Self {
        match err {
            VisualError::Image(e) => AppError::ImageGeneration(e.to_string()),
            VisualError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualResult {
    pub id: Uuid,
    pub order: u32,
    pub title: String,
    pub image_url: Option<String>,
    pub prompt: String,
    pub text_overlay: String,
    pub status: VisualStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualJobReport {
    pub job_id: Uuid,
    pub post_id: Uuid,
    pub results: Vec<VisualResult>,
    pub total_generated: u32,
    pub total_failed: u32,
}

impl VisualJobReport {
    pub fn new(job_id: Uuid, post_id: Uuid, results: Vec<VisualResult>) -> Self {
        let total_generated = results
            .iter()
            .filter(|r| r.status == VisualStatus::Completed)
            .count() as u32;
        let total_failed = results
            .iter()
            .filter(|r| r.status == VisualStatus::Failed)
            .count() as u32;
        Self {
            job_id,
            post_id,
            results,
            total_generated,
            total_failed,
        }
    }
}

/// Assigns `order` 1..=N by position. Insertion order is display order.
pub fn renumber(prompts: Vec<VisualPrompt>) -> Vec<VisualPrompt> {
    prompts
        .into_iter()
        .enumerate()
        .map(|(i, prompt)| VisualPrompt {
            order: i as u32 + 1,
            ..prompt
        })
        .collect()
}

/// Generates one image and uploads it. Returns the public URL.
pub async fn produce_visual(
    images: &dyn ImageGenerator,
    objects: &dyn ObjectStore,
    row: &VisualRow,
    prompt: &VisualPrompt,
) -> Result<String, VisualError> {
    let image = images.generate(&compose_image_prompt(prompt)).await?;
    let key = object_key(
        row.user_id,
        row.post_id,
        row.id,
        Uuid::new_v4(),
        image.extension(),
    );
    Ok(objects.put_image(&key, &image).await?)
}

/// Runs `produce_visual` and records the outcome on the row.
async fn render_and_record(
    ctx: &VisualContext<'_>,
    row: &VisualRow,
    prompt: &VisualPrompt,
) -> VisualResult {
    let outcome = match produce_visual(ctx.images, ctx.objects, row, prompt).await {
        Ok(url) => match ctx.records.record_completed(row.id, &url).await {
            Ok(()) => Ok(url),
            Err(e) => Err(format!("failed to record completed visual: {e}")),
        },
        Err(e) => Err(e.to_string()),
    };

    let (status, image_url, error) = match outcome {
        Ok(url) => (VisualStatus::Completed, Some(url), None),
        Err(message) => {
            warn!("Visual {} (order {}) failed: {message}", row.id, prompt.order);
            if let Err(e) = ctx.records.record_failed(row.id, &message).await {
                error!("Could not mark visual {} as failed: {e}", row.id);
            }
            (VisualStatus::Failed, None, Some(message))
        }
    };

    VisualResult {
        id: row.id,
        order: prompt.order,
        title: prompt.title.clone(),
        image_url,
        prompt: prompt.image_prompt.clone(),
        text_overlay: prompt.text_overlay.clone(),
        status,
        error,
    }
}

/// Runs a full batch for a post. The caller has already checked ownership and credits.
///
/// The images exist once the loop ends, so a failed credit charge is logged and
/// the report is still returned.
pub async fn run_visual_job(
    ctx: &VisualContext<'_>,
    job_id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    prompts: Vec<VisualPrompt>,
) -> Result<VisualJobReport, AppError> {
    if prompts.is_empty() {
        return Err(AppError::Validation(
            "Visual prompts are required for generation".to_string(),
        ));
    }

    let prompts = renumber(prompts);
    let rows = ctx
        .records
        .create_batch(job_id, post_id, user_id, &prompts)
        .await?;
    info!(
        "Job {job_id}: created {} visual rows for post {post_id} using {}",
        rows.len(),
        ctx.images.name()
    );

    let mut results = Vec::with_capacity(rows.len());
    for (i, (row, prompt)) in rows.iter().zip(prompts.iter()).enumerate() {
        if i > 0 && !ctx.delay.is_zero() {
            tokio::time::sleep(ctx.delay).await;
        }
        info!(
            "Job {job_id}: generating visual {}/{}: {}",
            i + 1,
            rows.len(),
            prompt.title
        );
        results.push(render_and_record(ctx, row, prompt).await);
    }

    let report = VisualJobReport::new(job_id, post_id, results);
    if let Err(e) = ctx
        .records
        .charge(user_id, ACTION_VISUAL_GENERATION, report.total_generated as i32)
        .await
    {
        error!(
            "Job {job_id}: could not charge {} credits to user {user_id}: {e}",
            report.total_generated
        );
    }

    info!(
        "Job {job_id}: {} completed, {} failed",
        report.total_generated, report.total_failed
    );
    Ok(report)
}

/// Re-runs the single-visual flow for an existing row. Costs one credit on success.
///
/// Unlike a batch, an upstream failure here is returned to the caller after the
/// row is marked `failed`.
pub async fn regenerate_visual(
    ctx: &VisualContext<'_>,
    row: VisualRow,
    new_prompt: Option<String>,
) -> Result<VisualResult, AppError> {
    let image_prompt = new_prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| row.prompt_used.clone());

    ctx.records.record_regenerating(row.id, &image_prompt).await?;
    info!("Regenerating visual {} for post {}", row.id, row.post_id);

    let prompt = VisualPrompt {
        order: row.generation_order.max(1) as u32,
        title: row.title.clone(),
        image_prompt,
        text_overlay: row.text_overlay.clone(),
        design_notes: String::new(),
    };

    let url = match produce_visual(ctx.images, ctx.objects, &row, &prompt).await {
        Ok(url) => url,
        Err(e) => {
            warn!("Regeneration of visual {} failed: {e}", row.id);
            ctx.records.record_failed(row.id, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    ctx.records.record_completed(row.id, &url).await?;
    if let Err(e) = ctx
        .records
        .charge(row.user_id, ACTION_VISUAL_REGENERATION, 1)
        .await
    {
        error!("Could not charge regeneration of visual {}: {e}", row.id);
    }

    Ok(VisualResult {
        id: row.id,
        order: prompt.order,
        title: prompt.title,
        image_url: Some(url),
        prompt: prompt.image_prompt,
        text_overlay: prompt.text_overlay,
        status: VisualStatus::Completed,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use std::sync::Mutex;

    use crate::visuals::image_client::GeneratedImage;

    struct FakeImages {
        fail_on: Option<&'static str>,
        prompts_seen: Mutex<Vec<String>>,
    }

    impl FakeImages {
        fn failing_on(fail_on: Option<&'static str>) -> Self {
            Self {
                fail_on,
                prompts_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for FakeImages {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
            self.prompts_seen.lock().unwrap().push(prompt.to_string());
            if self.fail_on.is_some_and(|needle| prompt.contains(needle)) {
                return Err(ImageError::NoImage);
            }
            Ok(GeneratedImage {
                bytes: Bytes::from_static(b"img"),
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakeObjects {
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for FakeObjects {
        async fn put_image(
            &self,
            key: &str,
            image: &GeneratedImage,
        ) -> Result<String, StorageError> {
            assert_eq!(image.bytes.as_ref(), b"img");
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("https://cdn.test/{key}"))
        }
    }

    /// In-memory rows and charges.
    #[derive(Default)]
    struct MemoryRecords {
        rows: Mutex<Vec<VisualRow>>,
        statuses_at_creation: Mutex<Vec<String>>,
        charges: Mutex<Vec<(String, i32)>>,
        fail_charges: bool,
    }

    impl MemoryRecords {
        fn set(&self, visual_id: Uuid, status: VisualStatus, url: Option<&str>) {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == visual_id) {
                row.status = status.as_str().to_string();
                if let Some(url) = url {
                    row.image_url = Some(url.to_string());
                }
            }
        }

        fn statuses(&self) -> Vec<String> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.status.clone())
                .collect()
        }
    }

    #[async_trait]
    impl VisualRecorder for MemoryRecords {
        async fn create_batch(
            &self,
            job_id: Uuid,
            post_id: Uuid,
            user_id: Uuid,
            prompts: &[VisualPrompt],
        ) -> Result<Vec<VisualRow>, AppError> {
            let created: Vec<VisualRow> = prompts
                .iter()
                .map(|p| VisualRow {
                    id: Uuid::new_v4(),
                    post_id,
                    user_id,
                    job_id,
                    prompt_used: p.image_prompt.clone(),
                    title: p.title.clone(),
                    text_overlay: p.text_overlay.clone(),
                    generation_order: p.order as i32,
                    image_url: None,
                    status: VisualStatus::Generating.as_str().to_string(),
                    error_message: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .collect();
            self.statuses_at_creation
                .lock()
                .unwrap()
                .extend(created.iter().map(|r| r.status.clone()));
            self.rows.lock().unwrap().extend(created.iter().cloned());
            Ok(created)
        }

        async fn record_completed(&self, visual_id: Uuid, image_url: &str) -> Result<(), AppError> {
            self.set(visual_id, VisualStatus::Completed, Some(image_url));
            Ok(())
        }

        async fn record_failed(&self, visual_id: Uuid, _message: &str) -> Result<(), AppError> {
            self.set(visual_id, VisualStatus::Failed, None);
            Ok(())
        }

        async fn record_regenerating(
            &self,
            visual_id: Uuid,
            _prompt_used: &str,
        ) -> Result<(), AppError> {
            self.set(visual_id, VisualStatus::Generating, None);
            Ok(())
        }

        async fn charge(
            &self,
            _user_id: Uuid,
            action_type: &str,
            credits: i32,
        ) -> Result<(), AppError> {
            if self.fail_charges {
                return Err(AppError::Internal(anyhow::anyhow!("usage table unavailable")));
            }
            self.charges
                .lock()
                .unwrap()
                .push((action_type.to_string(), credits));
            Ok(())
        }
    }

    fn context<'a>(
        records: &'a MemoryRecords,
        images: &'a FakeImages,
        objects: &'a FakeObjects,
    ) -> VisualContext<'a> {
        VisualContext {
            records,
            images,
            objects,
            delay: Duration::ZERO,
        }
    }

    fn row() -> VisualRow {
        VisualRow {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            prompt_used: "Blue chart".to_string(),
            title: "Intro".to_string(),
            text_overlay: String::new(),
            generation_order: 1,
            image_url: None,
            status: "completed".to_string(),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn prompt(image_prompt: &str) -> VisualPrompt {
        VisualPrompt {
            order: 1,
            title: "Intro".to_string(),
            image_prompt: image_prompt.to_string(),
            text_overlay: String::new(),
            design_notes: String::new(),
        }
    }

    fn result(status: VisualStatus) -> VisualResult {
        VisualResult {
            id: Uuid::new_v4(),
            order: 1,
            title: "t".to_string(),
            image_url: None,
            prompt: "p".to_string(),
            text_overlay: String::new(),
            status,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_batch_marks_failures_and_keeps_going() {
        let records = MemoryRecords::default();
        let images = FakeImages::failing_on(Some("broken"));
        let objects = FakeObjects::default();
        let prompts = vec![
            prompt("Title card"),
            prompt("Rising chart"),
            prompt("broken slide"),
            prompt("Closing call to action"),
        ];

        let report = run_visual_job(
            &context(&records, &images, &objects),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            prompts,
        )
        .await
        .unwrap();

        assert_eq!(
            *records.statuses_at_creation.lock().unwrap(),
            vec!["generating"; 4]
        );
        assert_eq!(
            records.statuses(),
            vec!["completed", "completed", "failed", "completed"]
        );
        assert_eq!(report.total_generated, 3);
        assert_eq!(report.total_failed, 1);
        assert_eq!(
            (report.total_generated + report.total_failed) as usize,
            report.results.len()
        );
        let orders: Vec<u32> = report.results.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert!(report.results[2].error.is_some());
        assert_eq!(images.prompts_seen.lock().unwrap().len(), 4);
        assert_eq!(objects.keys.lock().unwrap().len(), 3);
        assert_eq!(
            *records.charges.lock().unwrap(),
            vec![(ACTION_VISUAL_GENERATION.to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_batch_report_survives_failed_charge() {
        let records = MemoryRecords {
            fail_charges: true,
            ..Default::default()
        };
        let images = FakeImages::failing_on(None);
        let objects = FakeObjects::default();

        let report = run_visual_job(
            &context(&records, &images, &objects),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![prompt("Title card"), prompt("Rising chart")],
        )
        .await
        .unwrap();

        assert_eq!(report.total_generated, 2);
        assert_eq!(records.statuses(), vec!["completed", "completed"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_before_any_rows() {
        let records = MemoryRecords::default();
        let images = FakeImages::failing_on(None);
        let objects = FakeObjects::default();

        let err = run_visual_job(
            &context(&records, &images, &objects),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Vec::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(records.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regeneration_charges_one_credit_on_success() {
        let original = row();
        let records = MemoryRecords::default();
        records.rows.lock().unwrap().push(original.clone());
        let images = FakeImages::failing_on(None);
        let objects = FakeObjects::default();

        let result = regenerate_visual(
            &context(&records, &images, &objects),
            original,
            Some("  Green chart  ".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(result.status, VisualStatus::Completed);
        assert_eq!(result.prompt, "Green chart");
        assert_eq!(records.statuses(), vec!["completed"]);
        assert_eq!(
            *records.charges.lock().unwrap(),
            vec![(ACTION_VISUAL_REGENERATION.to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_failed_regeneration_marks_row_and_charges_nothing() {
        let original = row();
        let records = MemoryRecords::default();
        records.rows.lock().unwrap().push(original.clone());
        let images = FakeImages::failing_on(Some("Blue chart"));
        let objects = FakeObjects::default();

        let err = regenerate_visual(&context(&records, &images, &objects), original, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ImageGeneration(_)));
        assert_eq!(records.statuses(), vec!["failed"]);
        assert!(records.charges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_produce_visual_uploads_under_row_key() {
        let images = FakeImages::failing_on(None);
        let objects = FakeObjects::default();
        let row = row();

        let url = produce_visual(&images, &objects, &row, &prompt("Blue chart"))
            .await
            .unwrap();

        let keys = objects.keys.lock().unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with(&format!(
            "visuals/{}/{}/{}-",
            row.user_id, row.post_id, row.id
        )));
        assert!(keys[0].ends_with(".jpg"));
        assert_eq!(url, format!("https://cdn.test/{}", keys[0]));
        assert!(images.prompts_seen.lock().unwrap()[0].starts_with("Blue chart"));
    }

    #[tokio::test]
    async fn test_produce_visual_skips_upload_when_image_fails() {
        let images = FakeImages::failing_on(Some("broken"));
        let objects = FakeObjects::default();

        let err = produce_visual(&images, &objects, &row(), &prompt("broken slide"))
            .await
            .unwrap_err();

        assert!(matches!(err, VisualError::Image(ImageError::NoImage)));
        assert!(objects.keys.lock().unwrap().is_empty());
    }

    #[test]
    fn test_report_totals_cover_every_result() {
        let results = vec![
            result(VisualStatus::Completed),
            result(VisualStatus::Failed),
            result(VisualStatus::Completed),
            result(VisualStatus::Completed),
        ];
        let report = VisualJobReport::new(Uuid::new_v4(), Uuid::new_v4(), results);
        assert_eq!(report.total_generated, 3);
        assert_eq!(report.total_failed, 1);
    }

    #[test]
    fn test_visual_errors_map_to_upstream_and_storage() {
        let image: AppError = VisualError::Image(ImageError::NoImage).into();
        assert!(matches!(image, AppError::ImageGeneration(_)));

        let storage: AppError = VisualError::Storage(StorageError {
            key: "k".to_string(),
            message: "denied".to_string(),
        })
        .into();
        assert!(matches!(storage, AppError::Storage(msg) if msg.contains("denied")));
    }

    #[test]
    fn test_renumber_assigns_positions() {
        let prompts = vec![
            VisualPrompt {
                order: 5,
                ..prompt("a")
            },
            VisualPrompt {
                order: 5,
                ..prompt("b")
            },
            VisualPrompt {
                order: 0,
                ..prompt("c")
            },
        ];
        let orders: Vec<u32> = renumber(prompts).iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }
}
