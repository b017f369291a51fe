use crate::error::AppError;
use crate::models::AppSettings;
use photo_store::{
    AutoUpload, CaptureOptions, CaptureOutcome, CapturePipeline, CaptureRequest, CapturedFrame,
    HostRegistry, SensorSnapshot,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Builds the per-capture options from the stored settings.
///
/// Auto-upload targets the selected provider; hosts missing from the
/// registry are treated as if no provider was selected.
pub fn capture_options(
    settings: &AppSettings,
    registry: &HostRegistry,
    online: bool,
) -> CaptureOptions {
    let auto_upload = settings.cloud.selected().and_then(|(id, provider)| {
        let host = registry.get(id)?;
        Some(AutoUpload {
            host,
            settings: provider.clone(),
            online,
        })
    });

    CaptureOptions {
        enhancement: settings.enhancement,
        stabilization_delay: settings.stabilization_delay(),
        auto_upload,
    }
}

/// Captures a still read from `path`, as if the shutter had fired.
pub async fn capture_file(
    pipeline: &CapturePipeline,
    path: &Path,
    sensors: SensorSnapshot,
    note: Option<String>,
    options: CaptureOptions,
    cancel: &CancellationToken,
) -> Result<CaptureOutcome, AppError> {
    let image_data = tokio::fs::read(path).await?;
    if image_data.is_empty() {
        return Err(AppError::Validation(format!(
            "{} contains no image data",
            path.display()
        )));
    }

    let mut request = CaptureRequest::new(
        CapturedFrame {
            image_data,
            thumbnail_data: None,
        },
        sensors,
    );
    if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
        request = request.with_note(note);
    }

    let handle = pipeline.begin(request, options);
    let capture_token = handle.token().clone();
    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = tokio::select! {
        outcome = &mut wait => outcome,
        _ = cancel.cancelled() => {
            capture_token.cancel();
            wait.await
        }
    };
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::hosts::{default_registry, FolderHost};
    use photo_store::{AutoUploadOutcome, CaptureError, PhotoStore, SkipReason};
    use std::sync::Arc;

    fn settings_without_enhancement() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.enhancement.enabled = false;
        settings
    }

    #[test]
    fn test_capture_options_follow_settings() {
        let registry = default_registry();
        let mut settings = AppSettings::default();
        settings.stabilization_delay_ms = 250;

        let options = capture_options(&settings, &registry, true);
        assert!(options.auto_upload.is_none());
        assert_eq!(
            options.stabilization_delay,
            Some(std::time::Duration::from_millis(250))
        );

        settings.cloud.selected_provider = Some(FolderHost::ID.to_string());
        settings.cloud.provider_mut(FolderHost::ID).auto_upload = true;
        let options = capture_options(&settings, &registry, false);
        let target = options.auto_upload.unwrap();
        assert_eq!(target.host.id(), FolderHost::ID);
        assert!(!target.online);

        settings.cloud.selected_provider = Some("unknown".into());
        settings.cloud.provider_mut("unknown");
        assert!(capture_options(&settings, &registry, true)
            .auto_upload
            .is_none());
    }

    #[tokio::test]
    async fn test_capture_file_stores_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");
        std::fs::write(&path, b"raw frame").unwrap();
        let store = Arc::new(PhotoStore::open_in_memory().unwrap());
        let pipeline = CapturePipeline::new(Arc::clone(&store));
        let settings = settings_without_enhancement();

        let outcome = capture_file(
            &pipeline,
            &path,
            SensorSnapshot {
                latitude: Some(1.5),
                longitude: Some(2.5),
                ..SensorSnapshot::default()
            },
            Some("  ".into()),
            capture_options(&settings, &default_registry(), true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.record.image_data, b"raw frame");
        assert!(outcome.record.thumbnail_data.is_empty());
        assert_eq!(outcome.record.note, None);
        assert_eq!(
            outcome.auto_upload,
            AutoUploadOutcome::Skipped(SkipReason::Disabled)
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capture_file_auto_uploads_to_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");
        std::fs::write(&path, b"raw frame").unwrap();
        let store = Arc::new(PhotoStore::open_in_memory().unwrap());
        let pipeline = CapturePipeline::new(Arc::clone(&store));

        let mut settings = settings_without_enhancement();
        settings.cloud.selected_provider = Some(FolderHost::ID.to_string());
        let provider = settings.cloud.provider_mut(FolderHost::ID);
        provider.is_validated = true;
        provider.auto_upload = true;
        provider.fields.insert(
            "path".into(),
            mirror.path().to_string_lossy().into_owned().into(),
        );

        let outcome = capture_file(
            &pipeline,
            &path,
            SensorSnapshot::default(),
            Some("Street".into()),
            capture_options(&settings, &default_registry(), true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome.auto_upload, AutoUploadOutcome::Uploaded(_)));
        assert_eq!(store.cloud_uploaded_count().await.unwrap(), 1);
        assert_eq!(std::fs::read_dir(mirror.path()).unwrap().count(), 1);
        assert_eq!(store.note_history().await.unwrap(), vec!["Street"]);
    }

    #[tokio::test]
    async fn test_capture_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PhotoStore::open_in_memory().unwrap());
        let pipeline = CapturePipeline::new(Arc::clone(&store));
        let settings = settings_without_enhancement();
        let options = || capture_options(&settings, &default_registry(), true);

        let missing = capture_file(
            &pipeline,
            &dir.path().join("missing.jpg"),
            SensorSnapshot::default(),
            None,
            options(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(missing, Err(AppError::Filesystem(_))));

        let empty_path = dir.path().join("empty.jpg");
        std::fs::write(&empty_path, b"").unwrap();
        let empty = capture_file(
            &pipeline,
            &empty_path,
            SensorSnapshot::default(),
            None,
            options(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_capture_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");
        std::fs::write(&path, b"raw frame").unwrap();
        let store = Arc::new(PhotoStore::open_in_memory().unwrap());
        let pipeline = CapturePipeline::new(Arc::clone(&store));

        let mut settings = settings_without_enhancement();
        settings.stabilization_delay_ms = 60_000;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = capture_file(
            &pipeline,
            &path,
            SensorSnapshot::default(),
            None,
            capture_options(&settings, &default_registry(), true),
            &cancel,
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Capture(CaptureError::Cancelled))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
