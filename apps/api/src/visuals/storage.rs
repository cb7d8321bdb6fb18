//! Object storage for generated images. Uploads return the object's public URL.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::visuals::image_client::GeneratedImage;

#[derive(Debug, Error)]
#[error("Upload of '{key}' failed: {message}")]
pub struct StorageError {
    pub key: String,
    pub message: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the image under `key` and returns its public URL.
    async fn put_image(&self, key: &str, image: &GeneratedImage) -> Result<String, StorageError>;
}

/// Key layout: `visuals/{user}/{post}/{visual}-{attempt}.{ext}`.
/// A fresh attempt id per upload keeps regenerated images from reusing cached URLs.
pub fn object_key(
    user_id: Uuid,
    post_id: Uuid,
    visual_id: Uuid,
    attempt_id: Uuid,
    extension: &str,
) -> String {
    format!("visuals/{user_id}/{post_id}/{visual_id}-{attempt_id}.{extension}")
}

pub fn public_url(public_base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", public_base.trim_end_matches('/'), bucket, key)
}

/// S3-compatible bucket (AWS, MinIO, Supabase storage).
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_image(&self, key: &str, image: &GeneratedImage) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(image.bytes.clone()))
            .content_type(&image.mime_type)
            .send()
            .await
            .map_err(|e| StorageError {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded visual to s3://{}/{}", self.bucket, key);
        Ok(public_url(&self.public_base, &self.bucket, key))
    }
}
