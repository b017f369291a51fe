//! Capture pipeline: turns a shutter press into a stored photo.
//!
//! Each capture moves through `Idle -> Capturing -> Processing` and ends in
//! `Persisted` or `Failed`. Processing runs on a background task and is
//! cancelled when the next capture starts. Writing the record is the commit
//! point; a cancellation arriving after it only stops the auto-upload.

use crate::enhance::{enhance_image_blocking, EnhancementSettings};
use crate::error::StoreError;
use crate::models::{CloudData, NewPhoto, PhotoId, PhotoMetadata, PhotoRecord};
use crate::store::PhotoStore;
use crate::thumbnail::create_thumbnail_blocking;
use crate::upload::{upload_records, ProviderSettings, RemoteHost};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Composited image handed over by the camera collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub image_data: Vec<u8>,
    /// Generated by the pipeline when missing
    pub thumbnail_data: Option<Vec<u8>>,
}

/// Sensor readings at the moment of the shutter press.
///
/// Only latitude and longitude are persisted; the rest feeds the watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub tilt: Option<f64>,
}

impl SensorSnapshot {
    pub fn to_metadata(&self, timestamp: i64) -> PhotoMetadata {
        PhotoMetadata {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub frame: CapturedFrame,
    pub sensors: SensorSnapshot,
    pub note: Option<String>,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl CaptureRequest {
    /// A request stamped with the current time
    pub fn new(frame: CapturedFrame, sensors: SensorSnapshot) -> Self {
        Self {
            frame,
            sensors,
            note: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Target for uploading a capture right after it is stored
#[derive(Clone)]
pub struct AutoUpload {
    pub host: Arc<dyn RemoteHost>,
    pub settings: ProviderSettings,
    pub online: bool,
}

impl std::fmt::Debug for AutoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoUpload")
            .field("host", &self.host.id())
            .field("auto_upload", &self.settings.auto_upload)
            .field("is_validated", &self.settings.is_validated)
            .field("online", &self.online)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub enhancement: EnhancementSettings,
    /// Wait before processing so the device can settle
    pub stabilization_delay: Option<Duration>,
    pub auto_upload: Option<AutoUpload>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Processing,
    Persisted(PhotoId),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    NotValidated,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutoUploadOutcome {
    Skipped(SkipReason),
    Uploaded(CloudData),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub record: PhotoRecord,
    /// False when enhancement was disabled or failed
    pub enhanced: bool,
    pub auto_upload: AutoUploadOutcome,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Cancelled before the photo was stored
    #[error("capture cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("capture task failed: {0}")]
    Task(String),
}

/// A capture in flight
#[derive(Debug)]
pub struct CaptureHandle {
    token: CancellationToken,
    task: JoinHandle<Result<CaptureOutcome, CaptureError>>,
}

impl CaptureHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub async fn wait(self) -> Result<CaptureOutcome, CaptureError> {
        self.task
            .await
            .map_err(|e| CaptureError::Task(e.to_string()))?
    }
}

#[derive(Debug)]
struct Shared {
    store: Arc<PhotoStore>,
    state: watch::Sender<CaptureState>,
    current: Mutex<Option<(u64, CancellationToken)>>,
}

impl Shared {
    /// Only the newest capture may publish state.
    fn set_state(&self, seq: u64, state: CaptureState) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_ref().is_some_and(|(s, _)| *s == seq) {
            self.state.send_replace(state);
        }
    }
}

/// Runs captures against a store, one at a time
#[derive(Debug, Clone)]
pub struct CapturePipeline {
    shared: Arc<Shared>,
    next_seq: Arc<std::sync::atomic::AtomicU64>,
}

impl CapturePipeline {
    pub fn new(store: Arc<PhotoStore>) -> Self {
        let (state, _) = watch::channel(CaptureState::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                state,
                current: Mutex::new(None),
            }),
            next_seq: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CaptureState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> CaptureState {
        self.shared.state.borrow().clone()
    }

    /// Start a capture, cancelling the one still processing (if any).
    pub fn begin(&self, request: CaptureRequest, options: CaptureOptions) -> CaptureHandle {
        let seq = self
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let token = CancellationToken::new();

        {
            let mut current = self
                .shared
                .current
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some((previous, previous_token)) = current.replace((seq, token.clone())) {
                log::debug!("Capture {} superseded by {}", previous, seq);
                previous_token.cancel();
            }
        }
        self.shared.set_state(seq, CaptureState::Capturing);

        let shared = Arc::clone(&self.shared);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let result = process(&shared, seq, request, options, &task_token).await;
            match &result {
                Ok(_) => {}
                Err(CaptureError::Cancelled) => shared.set_state(seq, CaptureState::Idle),
                Err(e) => {
                    log::error!("Capture failed: {}", e);
                    shared.set_state(seq, CaptureState::Failed(e.to_string()));
                }
            }
            result
        });

        CaptureHandle { token, task }
    }
}

async fn process(
    shared: &Shared,
    seq: u64,
    request: CaptureRequest,
    options: CaptureOptions,
    token: &CancellationToken,
) -> Result<CaptureOutcome, CaptureError> {
    let store = &shared.store;
    shared.set_state(seq, CaptureState::Processing);

    if let Some(delay) = options.stabilization_delay {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = token.cancelled() => {}
        }
    }
    if token.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }

    let CaptureRequest {
        frame,
        sensors,
        note,
        timestamp,
    } = request;

    let mut enhanced = false;
    let image_data = if options.enhancement.is_active() {
        match enhance_image_blocking(frame.image_data.clone(), options.enhancement).await {
            Ok(data) => {
                enhanced = true;
                data
            }
            Err(e) => {
                log::warn!("Enhancement skipped: {}", e);
                frame.image_data
            }
        }
    } else {
        frame.image_data
    };
    if token.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }

    let config = store.config();
    let thumbnail_data = match frame.thumbnail_data {
        Some(thumb) => thumb,
        None => match create_thumbnail_blocking(
            image_data.clone(),
            config.thumbnail_size,
            config.jpeg_quality,
        )
        .await
        {
            Ok(thumb) => thumb,
            Err(e) => {
                log::warn!("Thumbnail generation failed: {}", e);
                Vec::new()
            }
        },
    };
    if token.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }

    let record = store
        .create(NewPhoto {
            image_data,
            thumbnail_data,
            metadata: sensors.to_metadata(timestamp),
            note: note.clone(),
        })
        .await?;
    shared.set_state(seq, CaptureState::Persisted(record.id.clone()));
    log::info!("Capture {} stored as {}", seq, record.id);

    if let Some(note) = note.as_deref() {
        if let Err(e) = store.save_note_to_history(note).await {
            log::error!("Failed to save note to history: {}", e);
        }
    }

    let auto_upload = match options.auto_upload {
        None => AutoUploadOutcome::Skipped(SkipReason::Disabled),
        Some(target) => auto_upload(store, &record.id, target, token).await,
    };

    let record = match &auto_upload {
        AutoUploadOutcome::Uploaded(cloud) => PhotoRecord {
            cloud: Some(cloud.clone()),
            ..record
        },
        _ => record,
    };

    Ok(CaptureOutcome {
        record,
        enhanced,
        auto_upload,
    })
}

async fn auto_upload(
    store: &PhotoStore,
    id: &PhotoId,
    target: AutoUpload,
    token: &CancellationToken,
) -> AutoUploadOutcome {
    if !target.settings.auto_upload {
        return AutoUploadOutcome::Skipped(SkipReason::Disabled);
    }
    if !target.settings.is_validated {
        return AutoUploadOutcome::Skipped(SkipReason::NotValidated);
    }
    if !target.online {
        return AutoUploadOutcome::Skipped(SkipReason::Offline);
    }
    if token.is_cancelled() {
        return AutoUploadOutcome::Cancelled;
    }

    let ids = [id.clone()];
    let summary = match upload_records(
        store,
        &ids,
        target.host,
        &target.settings,
        1,
        &|_, _| {},
        token,
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => return AutoUploadOutcome::Failed(e.to_string()),
    };

    if let Some(cloud) = summary.updated.get(id) {
        AutoUploadOutcome::Uploaded(cloud.clone())
    } else if summary.cancelled_count > 0 {
        AutoUploadOutcome::Cancelled
    } else {
        let msg = summary
            .errors
            .get(id)
            .cloned()
            .unwrap_or_else(|| "upload failed".to_string());
        AutoUploadOutcome::Failed(msg)
    }
}
