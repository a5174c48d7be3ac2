//! Object storage client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the object storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket holding uploaded source videos
    pub videos_bucket: String,
    /// Bucket holding event crops
    pub crops_bucket: String,
    /// Region (usually "auto" for S3-compatible stores)
    pub region: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            videos_bucket: std::env::var("STORAGE_VIDEOS_BUCKET")
                .unwrap_or_else(|_| "anpr-videos".to_string()),
            crops_bucket: std::env::var("STORAGE_CROPS_BUCKET")
                .unwrap_or_else(|_| "anpr-crops".to_string()),
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// S3-compatible storage client for videos and crops.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    videos_bucket: String,
    crops_bucket: String,
}

impl ObjectStorage {
    /// Create a new storage client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "anpr",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            videos_bucket: config.videos_bucket,
            crops_bucket: config.crops_bucket,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    /// Download a source video to a local file.
    pub async fn fetch_video(&self, key: &str, dest: impl AsRef<Path>) -> StorageResult<()> {
        let dest = dest.as_ref();
        debug!("Downloading video {} to {}", key, dest.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.videos_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        info!(
            "Downloaded video {} ({} bytes) to {}",
            key,
            bytes.len(),
            dest.display()
        );
        Ok(())
    }

    /// Upload crop JPEG bytes under `key`.
    ///
    /// Keys are generated per event and never reused, so uploads cannot
    /// overwrite each other.
    pub async fn put_crop(&self, bytes: Vec<u8>, key: &str) -> StorageResult<()> {
        debug!("Uploading crop ({} bytes) to {}", bytes.len(), key);

        self.client
            .put_object()
            .bucket(&self.crops_bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("image/jpeg")
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Check if a crop exists.
    pub async fn crop_exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.crops_bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Check connectivity by heading both buckets.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        for bucket in [&self.videos_bucket, &self.crops_bucket] {
            self.client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| {
                    StorageError::AwsSdk(format!("connectivity check failed for {}: {}", bucket, e))
                })?;
        }
        Ok(())
    }
}
