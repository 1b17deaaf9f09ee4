//! Object storage behind a trait: S3 in production, local filesystem for
//! development and tests. Clients get time-limited presigned URLs instead of
//! direct access.

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Default presigned-URL validity window.
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(300);

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    /// Time-limited URL for reading `key`.
    async fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String, AppError>;
    /// Time-limited URL for writing `key`.
    async fn presigned_put(&self, key: &str, ttl: Duration) -> Result<String, AppError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn url_for(&self, key: &str) -> String {
        // No real signing locally; the pseudo URL keeps callers uniform.
        format!("file://{}", self.base_path.join(key).display())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.base_path.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn presigned_get(&self, key: &str, _ttl: Duration) -> Result<String, AppError> {
        Ok(self.url_for(key))
    }

    async fn presigned_put(&self, key: &str, _ttl: Duration) -> Result<String, AppError> {
        Ok(self.url_for(key))
    }
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn presign_config(ttl: Duration) -> Result<PresigningConfig, AppError> {
        PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid presign TTL: {}", e)))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("S3 upload failed: {}", e)))?;
        Ok(())
    }

    async fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(ttl)?)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("S3 presign failed: {}", e)))?;
        Ok(presigned.uri().to_string())
    }

    async fn presigned_put(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(ttl)?)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("S3 presign failed: {}", e)))?;
        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload("invoices/INV-2025-0001.pdf", b"pdf bytes".to_vec())
            .await
            .unwrap();

        let url = storage
            .presigned_get("invoices/INV-2025-0001.pdf", DEFAULT_PRESIGN_TTL)
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("invoices/INV-2025-0001.pdf"));
    }
}
