// src/services/storage.rs
//! Object storage for uploaded files (admin avatars).
//!
//! The Firebase bucket is reached through the S3-compatible XML API using
//! HMAC keys, so the regular S3 client works with a custom endpoint.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info};

use crate::common::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage not configured")]
    NotConfigured,

    #[error("upload failed: {0}")]
    Upload(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the object and returns a URL the browser can load it from
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

pub struct BucketStorage {
    client: Option<(S3Client, StorageConfig)>,
}

impl BucketStorage {
    pub async fn connect(config: Option<StorageConfig>) -> Self {
        let Some(config) = config else {
            return Self { client: None };
        };

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "hmac",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "Object storage client ready");
        Self {
            client: Some((S3Client::from_conf(s3_config), config)),
        }
    }
}

/// Public URL for an object; each key segment is percent-encoded.
pub fn public_url(endpoint: &str, bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        bucket,
        encoded.join("/")
    )
}

/// Keeps letters, digits, dots, dashes and underscores; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let (client, config) = self.client.as_ref().ok_or(StorageError::NotConfigured)?;
        let size = data.len();

        client
            .put_object()
            .bucket(&config.bucket)
            .key(key)
            .body(ByteStream::from(Bytes::from(data)))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %key, "Failed to upload object");
                StorageError::Upload(e.to_string())
            })?;

        info!(key = %key, bucket = %config.bucket, size, "Object uploaded");
        Ok(public_url(&config.endpoint, &config.bucket, key))
    }
}
