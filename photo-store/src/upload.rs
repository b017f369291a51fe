//! Uploading photos to remote image hosts.
//!
//! A [`RemoteHost`] is a provider (an image hosting API, for example) behind a
//! small fixed interface. The [`UploadOrchestrator`] drives batches against a
//! host: records are split into chunks of `concurrency`, chunks run one after
//! the other and the uploads inside a chunk run concurrently on a `JoinSet`.
//! The cancellation token is checked before each chunk and handed to every
//! upload, so a host can also abort work that is already in flight.

use crate::error::StoreResult;
use crate::models::{CloudData, PhotoId, PhotoPatch, PhotoSummary};
use crate::store::PhotoStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Uploads started at once unless the caller asks otherwise
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Called with `(completed, total)` once per settled record
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// One image handed to a host
#[derive(Debug, Clone, PartialEq)]
pub struct UploadImage {
    pub id: PhotoId,
    pub image_data: Vec<u8>,
}

/// Per-provider settings. `fields` holds provider specific keys (API key,
/// expiration, ...) exactly as the provider defines them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub is_validated: bool,
    #[serde(default)]
    pub auto_upload: bool,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ProviderSettings {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Result of uploading one record
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(CloudData),
    /// Network or provider failure, with a human readable message
    Failed(String),
    /// Never started, or aborted by the host because the token fired
    Cancelled,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadOutcome::Cancelled)
    }

    pub fn cloud(&self) -> Option<&CloudData> {
        match self {
            UploadOutcome::Uploaded(cloud) => Some(cloud),
            _ => None,
        }
    }
}

/// A remote image host
#[async_trait]
pub trait RemoteHost: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Check credentials and settings with the provider
    async fn validate(
        &self,
        settings: &ProviderSettings,
        cancel: &CancellationToken,
    ) -> ValidationResult;

    /// Upload a single image. Implementations should return
    /// [`UploadOutcome::Cancelled`] when they abort because `cancel` fired.
    async fn upload(
        &self,
        image: &[u8],
        settings: &ProviderSettings,
        cancel: &CancellationToken,
    ) -> UploadOutcome;

    /// Upload a batch. The default runs the [`UploadOrchestrator`].
    async fn upload_multiple(
        self: Arc<Self>,
        images: Vec<UploadImage>,
        settings: &ProviderSettings,
        on_progress: ProgressFn<'_>,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> HashMap<PhotoId, UploadOutcome> {
        UploadOrchestrator::new(concurrency)
            .run(self, images, settings, on_progress, cancel)
            .await
    }
}

/// Known hosts, in registration order
#[derive(Clone, Default)]
pub struct HostRegistry {
    hosts: Vec<Arc<dyn RemoteHost>>,
    default_id: Option<String>,
}

impl fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRegistry")
            .field("hosts", &self.ids())
            .field("default_id", &self.default_id)
            .finish()
    }
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host, replacing one with the same id.
    ///
    /// The first host registered becomes the default.
    pub fn register(&mut self, host: Arc<dyn RemoteHost>, is_default: bool) {
        let id = host.id().to_string();
        match self.hosts.iter().position(|h| h.id() == id) {
            Some(index) => self.hosts[index] = host,
            None => self.hosts.push(host),
        }
        if is_default || self.hosts.len() == 1 {
            self.default_id = Some(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RemoteHost>> {
        self.hosts.iter().find(|h| h.id() == id).cloned()
    }

    pub fn default_host(&self) -> Option<Arc<dyn RemoteHost>> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn all(&self) -> &[Arc<dyn RemoteHost>] {
        &self.hosts
    }

    pub fn ids(&self) -> Vec<&str> {
        self.hosts.iter().map(|h| h.id()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.hosts.iter().any(|h| h.id() == id)
    }
}

/// Chunked, cancellable batch uploads
#[derive(Debug, Clone, Copy)]
pub struct UploadOrchestrator {
    concurrency: usize,
}

impl Default for UploadOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl UploadOrchestrator {
    /// A concurrency of 0 is treated as 1
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Upload `images` and return exactly one outcome per input id.
    ///
    /// Records that were not started when the token fired are
    /// [`UploadOutcome::Cancelled`] and do not report progress. Uploads that
    /// were already dispatched keep running and their outcome is recorded.
    /// Callers are expected to filter out records that are already uploaded.
    pub async fn run<H>(
        &self,
        host: Arc<H>,
        images: Vec<UploadImage>,
        settings: &ProviderSettings,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> HashMap<PhotoId, UploadOutcome>
    where
        H: RemoteHost + ?Sized,
    {
        let total = images.len();
        let settings = Arc::new(settings.clone());
        let mut results = HashMap::with_capacity(total);
        let mut completed = 0usize;
        let mut remaining = images;

        log::info!(
            "Uploading {} photos to {} ({} at a time)",
            total,
            host.name(),
            self.concurrency
        );

        while !remaining.is_empty() {
            if cancel.is_cancelled() {
                log::info!("Upload cancelled, {} photos not started", remaining.len());
                for image in remaining.drain(..) {
                    results.insert(image.id, UploadOutcome::Cancelled);
                }
                break;
            }

            let take = self.concurrency.min(remaining.len());
            let mut join_set = JoinSet::new();
            let mut owners = HashMap::with_capacity(take);

            for image in remaining.drain(..take) {
                let host = Arc::clone(&host);
                let settings = Arc::clone(&settings);
                let token = cancel.clone();
                let photo_id = image.id.clone();

                let handle = join_set.spawn(async move {
                    host.upload(&image.image_data, &settings, &token).await
                });
                owners.insert(handle.id(), photo_id);
            }

            while let Some(joined) = join_set.join_next_with_id().await {
                let (task_id, outcome) = match joined {
                    Ok((task_id, outcome)) => (task_id, outcome),
                    Err(e) => (e.id(), UploadOutcome::Failed(format!("Upload task failed: {}", e))),
                };
                let Some(photo_id) = owners.remove(&task_id) else {
                    continue;
                };

                match &outcome {
                    UploadOutcome::Uploaded(cloud) => {
                        log::debug!("Photo {} uploaded: {}", photo_id, cloud.url)
                    }
                    UploadOutcome::Failed(msg) => log::error!("Photo {}: {}", photo_id, msg),
                    UploadOutcome::Cancelled => log::debug!("Photo {} upload aborted", photo_id),
                }

                results.insert(photo_id, outcome);
                completed += 1;
                on_progress(completed, total);
            }
        }

        log::info!(
            "Upload finished: {} of {} photos uploaded",
            results.values().filter(|o| o.is_success()).count(),
            total
        );
        results
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Success,
    Cancelled,
    Error,
}

/// Counts after a batch upload has been written back to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub cancelled_count: usize,
    pub updated: HashMap<PhotoId, CloudData>,
    /// Failure message per photo that counted as an error
    pub errors: HashMap<PhotoId, String>,
}

impl UploadSummary {
    /// Any cancellation wins, then "nothing but errors", otherwise success.
    pub fn kind(&self) -> SummaryKind {
        if self.cancelled_count > 0 {
            SummaryKind::Cancelled
        } else if self.error_count > 0 && self.success_count == 0 {
            SummaryKind::Error
        } else {
            SummaryKind::Success
        }
    }
}

/// Outcome of checking whether an upload can start
#[derive(Debug, Clone, PartialEq)]
pub enum UploadValidation {
    /// No provider selected, unknown provider, or settings not validated
    NoProvider,
    AllUploaded,
    Ready(Vec<PhotoId>),
}

pub fn validate_upload_request(
    registry: &HostRegistry,
    provider_id: Option<&str>,
    settings: Option<&ProviderSettings>,
    photos: &[PhotoSummary],
) -> UploadValidation {
    let provider_ok = match (provider_id, settings) {
        (Some(id), Some(settings)) => settings.is_validated && registry.contains(id),
        _ => false,
    };
    if !provider_ok {
        return UploadValidation::NoProvider;
    }

    let pending: Vec<PhotoId> = photos
        .iter()
        .filter(|p| !p.is_uploaded())
        .map(|p| p.id.clone())
        .collect();
    if pending.is_empty() {
        UploadValidation::AllUploaded
    } else {
        UploadValidation::Ready(pending)
    }
}

/// Upload stored photos and write the cloud data back.
///
/// Photos whose image data is missing are skipped with a warning. A
/// successful upload whose write-back fails counts as an error; the remote
/// copy is left in place and its delete URL logged.
pub async fn upload_records(
    store: &PhotoStore,
    ids: &[PhotoId],
    host: Arc<dyn RemoteHost>,
    settings: &ProviderSettings,
    concurrency: usize,
    on_progress: ProgressFn<'_>,
    cancel: &CancellationToken,
) -> StoreResult<UploadSummary> {
    let mut images = Vec::with_capacity(ids.len());
    for id in ids {
        match store.get_image_data(id).await? {
            Some(image_data) => images.push(UploadImage {
                id: id.clone(),
                image_data,
            }),
            None => log::warn!("Could not load image data for photo {}", id),
        }
    }

    let provider = host.id().to_string();
    let results = host
        .upload_multiple(images, settings, on_progress, concurrency, cancel)
        .await;

    let mut summary = UploadSummary::default();
    for (photo_id, outcome) in results {
        match outcome {
            UploadOutcome::Cancelled => summary.cancelled_count += 1,
            UploadOutcome::Failed(msg) => {
                summary.errors.insert(photo_id, msg);
                summary.error_count += 1;
            }
            UploadOutcome::Uploaded(mut cloud) => {
                if cloud.provider.is_none() {
                    cloud.provider = Some(provider.clone());
                }
                match store.update(&photo_id, PhotoPatch::cloud(cloud.clone())).await {
                    Ok(_) => {
                        summary.updated.insert(photo_id, cloud);
                        summary.success_count += 1;
                    }
                    Err(e) => {
                        log::warn!(
                            "Failed to record upload of photo {} ({}); remote copy can be removed at {}",
                            photo_id,
                            e,
                            cloud.delete_url
                        );
                        summary.errors.insert(photo_id, e.to_string());
                        summary.error_count += 1;
                    }
                }
            }
        }
    }

    Ok(summary)
}
