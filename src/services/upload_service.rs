use crate::error::AppError;
use crate::models::AppSettings;
use photo_store::{
    upload_records, validate_upload_request, HostRegistry, PhotoStore, SortOrder, UploadSummary,
    UploadValidation,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Progress channel for photo uploads: (current, total)
pub fn upload_progress_channel() -> (
    watch::Sender<(usize, usize)>,
    watch::Receiver<(usize, usize)>,
) {
    watch::channel((0, 0))
}

/// Result of a manual "upload everything pending" run
#[derive(Debug)]
pub enum UploadRun {
    NoProvider,
    AllUploaded,
    Finished(UploadSummary),
}

/// Uploads every photo without cloud data to the selected provider
pub async fn upload_pending(
    store: &PhotoStore,
    registry: &HostRegistry,
    settings: &AppSettings,
    concurrency: usize,
    progress: &watch::Sender<(usize, usize)>,
    cancel: &CancellationToken,
) -> Result<UploadRun, AppError> {
    let photos = store.photo_summaries(SortOrder::Oldest).await?;
    let (provider_id, provider_settings) = match settings.cloud.selected() {
        Some((id, provider)) => (Some(id), Some(provider)),
        None => (None, None),
    };

    let ids = match validate_upload_request(registry, provider_id, provider_settings, &photos) {
        UploadValidation::NoProvider => return Ok(UploadRun::NoProvider),
        UploadValidation::AllUploaded => return Ok(UploadRun::AllUploaded),
        UploadValidation::Ready(ids) => ids,
    };
    let (Some(host), Some(provider_settings)) =
        (provider_id.and_then(|id| registry.get(id)), provider_settings)
    else {
        return Ok(UploadRun::NoProvider);
    };

    log::info!("Found {} photos to upload", ids.len());
    progress.send_replace((0, ids.len()));
    let on_progress = |current: usize, total: usize| {
        progress.send_replace((current, total));
    };

    let summary = upload_records(
        store,
        &ids,
        host,
        provider_settings,
        concurrency,
        &on_progress,
        cancel,
    )
    .await?;

    log::info!(
        "Uploaded {} photos ({} failed, {} cancelled)",
        summary.success_count,
        summary.error_count,
        summary.cancelled_count
    );
    Ok(UploadRun::Finished(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::hosts::{default_registry, FolderHost};
    use photo_store::{NewPhoto, PhotoMetadata, SummaryKind};

    async fn store_with_photos(n: i64) -> PhotoStore {
        let store = PhotoStore::open_in_memory().unwrap();
        for ts in 0..n {
            store
                .create(NewPhoto {
                    image_data: format!("image {}", ts).into_bytes(),
                    thumbnail_data: Vec::new(),
                    metadata: PhotoMetadata {
                        latitude: None,
                        longitude: None,
                        timestamp: ts,
                    },
                    note: None,
                })
                .await
                .unwrap();
        }
        store
    }

    fn settings_for(dir: &std::path::Path, validated: bool) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.cloud.selected_provider = Some(FolderHost::ID.to_string());
        let provider = settings.cloud.provider_mut(FolderHost::ID);
        provider.is_validated = validated;
        provider
            .fields
            .insert("path".into(), dir.to_string_lossy().into_owned().into());
        settings
    }

    #[tokio::test]
    async fn test_upload_pending_mirrors_and_writes_back() {
        let store = store_with_photos(5).await;
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry();
        let settings = settings_for(dir.path(), true);
        let (sender, progress) = upload_progress_channel();

        let token = CancellationToken::new();
        let run = upload_pending(&store, &registry, &settings, 3, &sender, &token)
            .await
            .unwrap();

        let UploadRun::Finished(summary) = run else {
            panic!("expected a finished run, got {:?}", run);
        };
        assert_eq!(summary.success_count, 5);
        assert_eq!(summary.kind(), SummaryKind::Success);
        assert_eq!(store.cloud_uploaded_count().await.unwrap(), 5);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 5);
        assert_eq!(*progress.borrow(), (5, 5));

        let again = upload_pending(&store, &registry, &settings, 3, &sender, &token)
            .await
            .unwrap();
        assert!(matches!(again, UploadRun::AllUploaded));
    }

    #[tokio::test]
    async fn test_unvalidated_provider_does_not_upload() {
        let store = store_with_photos(2).await;
        let dir = tempfile::tempdir().unwrap();

        let run = upload_pending(
            &store,
            &default_registry(),
            &settings_for(dir.path(), false),
            3,
            &upload_progress_channel().0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(matches!(run, UploadRun::NoProvider));

        let run = upload_pending(
            &store,
            &default_registry(),
            &AppSettings::default(),
            3,
            &upload_progress_channel().0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(matches!(run, UploadRun::NoProvider));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = store_with_photos(4).await;
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let run = upload_pending(
            &store,
            &default_registry(),
            &settings_for(dir.path(), true),
            3,
            &upload_progress_channel().0,
            &token,
        )
        .await
        .unwrap();

        let UploadRun::Finished(summary) = run else {
            panic!("expected a finished run");
        };
        assert_eq!(summary.cancelled_count, 4);
        assert_eq!(summary.kind(), SummaryKind::Cancelled);
        assert_eq!(store.cloud_uploaded_count().await.unwrap(), 0);
    }
}
