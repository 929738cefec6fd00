use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Blob name to store on a listing
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedUrl {
    pub name: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
