use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SupabaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Supabase API error: {status} - {message}")]
    Api { status: StatusCode, message: String },
}

/// Row shape of the remote `videos` table. Field names are the column names.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub r2_object_key: String,
    pub title: String,
    pub description: Option<String>,
    pub author_id: String,
}

/// Persists one descriptive row per uploaded object. The upload path takes
/// this as an optional capability; absence means saves are skipped.
#[async_trait]
pub trait MetadataRecorder: Send + Sync {
    async fn insert_video(&self, record: &VideoRecord) -> Result<(), MetadataError>;
}

pub struct MetadataClient {
    client: Client,
    rest_url: String,
    anon_key: String,
}

impl MetadataClient {
    pub fn new(cfg: &SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", cfg.url.trim_end_matches('/')),
            anon_key: cfg.anon_key.clone(),
        }
    }
}

#[async_trait]
impl MetadataRecorder for MetadataClient {
    async fn insert_video(&self, record: &VideoRecord) -> Result<(), MetadataError> {
        let url = format!("{}/videos", self.rest_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            Err(MetadataError::Api { status, message })
        }
    }
}
