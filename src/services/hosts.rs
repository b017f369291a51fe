//! Remote hosts available to the app.

use async_trait::async_trait;
use photo_store::{
    CloudData, HostRegistry, ProviderSettings, RemoteHost, UploadOutcome, ValidationResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Mirrors photos into a directory, e.g. a mounted network share.
///
/// Settings fields: `path` (target directory, required) and `expiration`
/// (seconds, optional; only recorded, nothing is deleted automatically).
#[derive(Debug, Default)]
pub struct FolderHost;

impl FolderHost {
    pub const ID: &'static str = "folder";

    pub fn new() -> Self {
        Self
    }

    fn target_dir(settings: &ProviderSettings) -> Result<PathBuf, String> {
        match settings.field_str("path") {
            Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path.trim())),
            _ => Err("no target directory configured".to_string()),
        }
    }
}

#[async_trait]
impl RemoteHost for FolderHost {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Local folder"
    }

    async fn validate(
        &self,
        settings: &ProviderSettings,
        _cancel: &CancellationToken,
    ) -> ValidationResult {
        let dir = match Self::target_dir(settings) {
            Ok(dir) => dir,
            Err(e) => return ValidationResult::invalid(e),
        };
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => ValidationResult::ok(),
            Ok(_) => ValidationResult::invalid(format!(
                "{} is not a writable directory",
                dir.display()
            )),
            Err(e) => ValidationResult::invalid(format!("{}: {}", dir.display(), e)),
        }
    }

    async fn upload(
        &self,
        image: &[u8],
        settings: &ProviderSettings,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        if cancel.is_cancelled() {
            return UploadOutcome::Cancelled;
        }
        let dir = match Self::target_dir(settings) {
            Ok(dir) => dir,
            Err(e) => return UploadOutcome::Failed(e),
        };

        let name = format!("{}.jpg", ulid::Ulid::new());
        let path = dir.join(&name);
        let data = image.to_vec();
        let write_path = path.clone();
        let written = tokio::task::spawn_blocking(move || std::fs::write(&write_path, data)).await;

        match written {
            Ok(Ok(())) => {
                let uploaded_at = chrono::Utc::now().timestamp_millis();
                let expires_at = settings
                    .field("expiration")
                    .and_then(serde_json::Value::as_i64)
                    .filter(|secs| *secs > 0)
                    .map(|secs| uploaded_at + secs * 1000);
                let url = format!("file://{}", path.display());
                log::debug!("Mirrored photo to {}", path.display());
                UploadOutcome::Uploaded(CloudData {
                    viewer_url: url.clone(),
                    delete_url: path.display().to_string(),
                    url,
                    uploaded_at,
                    expires_at,
                    provider: Some(Self::ID.to_string()),
                })
            }
            Ok(Err(e)) => UploadOutcome::Failed(format!("{}: {}", path.display(), e)),
            Err(e) => UploadOutcome::Failed(format!("Write task failed: {}", e)),
        }
    }
}

/// Registry with every built-in host; the folder mirror is the default.
pub fn default_registry() -> HostRegistry {
    let mut registry = HostRegistry::new();
    registry.register(Arc::new(FolderHost::new()), true);
    registry
}
