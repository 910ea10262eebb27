//! Media storage for character artwork.
//!
//! Objects are written to an S3-compatible bucket and addressed by their
//! public URL (`{MEDIA_PUBLIC_URL}/{key}`), which is what the database stores.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("delete of {key} failed: {reason}")]
    Delete { key: String, reason: String },

    #[error("{0} is not a URL managed by this media store")]
    ForeignUrl(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err.to_string())
    }
}

/// Carried in `AppState` as `Arc<dyn MediaStore>`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `body` under a fresh key derived from `folder` and `file_name`
    /// and returns its public URL.
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, MediaError>;

    /// Removes the object behind a URL previously returned by `upload`.
    async fn delete(&self, url: &str) -> Result<(), MediaError>;
}

/// Builds the object key. File names are reduced to a safe charset.
pub fn object_key(folder: &str, file_name: &str) -> String {
    let clean: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = if clean.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        clean
    };
    format!("{}/{}-{}", folder.trim_matches('/'), Uuid::new_v4(), clean)
}

/// Inverse of `{public_base}/{key}`.
pub fn key_from_url<'a>(public_base: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(public_base)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3MediaStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base,
        }
    }

    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn from_config(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "questline-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .load()
            .await;

        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&s3_config)
                .force_path_style(true)
                .build(),
        );

        Self::new(
            client,
            config.s3_bucket.clone(),
            config.media_public_url.clone(),
        )
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, MediaError> {
        let key = object_key(folder, file_name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| MediaError::Upload {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        info!("Uploaded media to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let key = key_from_url(&self.public_base, url)
            .ok_or_else(|| MediaError::ForeignUrl(url.to_string()))?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MediaError::Delete {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        info!("Deleted media s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// Deletes each URL, logging failures instead of returning them.
pub async fn delete_quietly(store: &dyn MediaStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = store.delete(url).await {
            warn!("Media cleanup failed: {e}");
        }
    }
}
