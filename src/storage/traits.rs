//! Object storage capability and artifact naming

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

/// Content type of every republished image
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// A publicly readable uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedArtifact {
    pub public_url: String,
}

/// Capabilities the orchestrator needs from an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store name for logs
    fn name(&self) -> &str;

    /// Write `bytes` under `key`, make it publicly readable and return its public URL
    async fn upload(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Result<String>;
}

/// Generate a fresh object file name: `YYYYmmdd_HHMMSS_<8 hex>.jpg`
pub fn object_name() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}.jpg", timestamp, &suffix[..8])
}

/// Full object key under the configured folder prefix.
///
/// The prefix is used verbatim, so a folder is expected to end with `/`.
pub fn object_key(folder: &str, name: &str) -> String {
    format!("{}{}", folder, name)
}
