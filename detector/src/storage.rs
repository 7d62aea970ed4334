use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_types::region::Region;
use motion_watch_common::config::UploadConfig;
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Ships an archived snapshot off the device.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Returns the remote object key, or `None` when uploading is switched off.
    async fn upload(&self, local_path: &Path) -> Result<Option<String>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to check bucket: {0}")]
    HeadBucket(String),
    #[error("failed to create bucket: {0}")]
    CreateBucket(String),
    #[error("failed to read {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("path has no file name: {0}")]
    NoFileName(String),
    #[error("failed to put object: {0}")]
    PutObject(String),
    #[error("storage operation did not finish within {0}s")]
    Timeout(u64),
}

/// S3-compatible object storage authenticated with a static key pair.
pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    timeout: Duration,
    bucket_ready: AtomicBool,
}

impl S3Uploader {
    pub async fn new(config: &UploadConfig) -> Self {
        let creds = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "static",
        );

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.timeout())
            .build();

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .credentials_provider(creds)
            .region(Region::new(config.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            timeout: config.timeout(),
            bucket_ready: AtomicBool::new(false),
        }
    }

    /// Build the uploader and check the bucket once. A failed check is logged
    /// and retried on the next upload; it never stops startup.
    pub async fn connect(config: &UploadConfig) -> Self {
        let uploader = Self::new(config).await;
        if let Err(e) = uploader.ensure_bucket().await {
            error!(
                error = %e,
                bucket = uploader.bucket,
                "upload bucket unavailable at startup, will retry on first upload"
            );
        }
        uploader
    }

    /// Ensure the bucket exists, creating it if necessary.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let head = self
            .bounded(
                self.client.head_bucket().bucket(&self.bucket).send(),
                StorageError::HeadBucket,
            )
            .await;

        match head {
            Ok(_) => info!(bucket = self.bucket, "bucket exists"),
            Err(StorageError::Timeout(secs)) => return Err(StorageError::Timeout(secs)),
            Err(_) => {
                info!(bucket = self.bucket, "creating bucket");
                self.bounded(
                    self.client.create_bucket().bucket(&self.bucket).send(),
                    StorageError::CreateBucket,
                )
                .await?;
                info!(bucket = self.bucket, "bucket created");
            }
        }

        self.bucket_ready.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn bucket_ready(&self) -> bool {
        self.bucket_ready.load(Ordering::Relaxed)
    }

    /// Run one SDK call under the configured timeout.
    async fn bounded<T, E, F>(
        &self,
        call: F,
        wrap: fn(String) -> StorageError,
    ) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(wrap(e.to_string())),
            Err(_) => Err(StorageError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    /// Upload the file under `<prefix><file name>` and return the object key.
    async fn upload(&self, local_path: &Path) -> Result<Option<String>, StorageError> {
        let key = object_key(&self.prefix, local_path)?;
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::ReadFile(local_path.display().to_string(), e))?;
        let size = data.len();

        if !self.bucket_ready() {
            if let Err(e) = self.ensure_bucket().await {
                warn!(error = %e, bucket = self.bucket, "bucket check failed, trying upload anyway");
            }
        }

        self.bounded(
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type("image/jpeg")
                .body(ByteStream::from(data))
                .send(),
            StorageError::PutObject,
        )
        .await?;

        debug!(key, size, bucket = self.bucket, "uploaded snapshot");
        Ok(Some(key))
    }
}

/// Used when `upload.enabled = false`.
pub struct DisabledUploader;

#[async_trait]
impl Uploader for DisabledUploader {
    async fn upload(&self, local_path: &Path) -> Result<Option<String>, StorageError> {
        debug!(
            path = local_path.display().to_string(),
            "uploads disabled, skipping"
        );
        Ok(None)
    }
}

/// Object key for a local snapshot: the prefix followed by the file name.
fn object_key(prefix: &str, local_path: &Path) -> Result<String, StorageError> {
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::NoFileName(local_path.display().to_string()))?;
    Ok(format!("{prefix}{name}"))
}
