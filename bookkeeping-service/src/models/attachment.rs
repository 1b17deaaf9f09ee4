//! Receipt attachments stored in object storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Attachment metadata. The bytes live in object storage under `storage_key`;
/// clients upload and download via presigned URLs.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: Uuid,
    pub storage_key: String,
    pub file_name: String,
    pub content_type: String,
    pub uploaded_by: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for registering a new attachment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAttachment {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
}
