use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Object;
use aws_sdk_s3::{Client, Config};
use serde::Serialize;

use crate::config::R2Config;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    Operation(String),
}

/// One entry from a bucket listing.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

impl ObjectSummary {
    fn from_object(obj: &Object) -> Self {
        Self {
            key: obj.key().unwrap_or_default().to_string(),
            size: obj.size().unwrap_or(0).max(0) as u64,
            last_modified: obj.last_modified().map(|t| t.to_string()),
        }
    }
}

/// The storage surface the upload path depends on, so tests can substitute
/// a fake for the real client.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), StorageError>;

    fn bucket(&self) -> &str;
}

#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Builds a client against the account's R2 endpoint. Construction does
    /// no I/O; the first request goes over the wire.
    pub fn new(cfg: &R2Config) -> Self {
        let creds = Credentials::new(
            &cfg.access_key_id,
            &cfg.secret_access_key,
            None,
            None,
            "cloudflare_r2",
        );

        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(cfg.endpoint_url())
            .credentials_provider(creds)
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: cfg.bucket.clone(),
        }
    }

    /// Connectivity probe. Cheap request that fails on bad credentials,
    /// unknown bucket, or an unreachable endpoint.
    pub async fn head_bucket(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Operation(aws_sdk_s3::Error::from(e).to_string()))?;
        Ok(())
    }

    /// Lists up to `max_keys` objects under `prefix`. An empty bucket yields
    /// an empty vec.
    pub async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| StorageError::Operation(aws_sdk_s3::Error::from(e).to_string()))?;

        Ok(resp.contents().iter().map(ObjectSummary::from_object).collect())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Operation(aws_sdk_s3::Error::from(e).to_string()))?;
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
