//! # Photo Store
//!
//! On-device photo storage and the capture/upload pipeline of a camera app.
//!
//! This crate provides:
//! - A SQLite backed record store with a cached per-folder aggregate view
//! - Cursor pagination over the capture timestamp with folder, location and
//!   note filters
//! - A settings collection (app settings, note autocomplete history)
//! - Thumbnail generation and best-effort image enhancement
//! - A capture pipeline that stores a shot and optionally uploads it
//! - Chunked, cancellable batch uploads to pluggable remote image hosts
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_store::{PageRequest, PhotoStore, PhotoStoreConfig, SortOrder};
//!
//! let store = PhotoStore::open("/path/to/photos.db", PhotoStoreConfig::default())?;
//! let page = store.query_page(PageRequest::new(SortOrder::Newest, 50)).await?;
//! let folders = store.folder_stats().await?;
//! ```

pub mod cache;
pub mod capture;
pub mod enhance;
pub mod error;
pub mod models;
pub mod query;
pub mod schema;
pub mod settings;
pub mod store;
pub mod thumbnail;
pub mod upload;

pub use cache::{AggregateCache, FolderCounts};
pub use capture::{
    AutoUpload, AutoUploadOutcome, CaptureError, CaptureHandle, CaptureOptions, CaptureOutcome,
    CapturePipeline, CaptureRequest, CaptureState, CapturedFrame, SensorSnapshot, SkipReason,
};
pub use enhance::{enhance_image, EnhanceError, EnhancementSettings};
pub use error::{StoreError, StoreResult};
pub use models::{
    CloudData, Folder, FolderStats, NewPhoto, PhotoCounts, PhotoId, PhotoMetadata, PhotoPatch,
    PhotoRecord, PhotoStoreConfig, PhotoSummary, PhotoWithThumbnail,
};
pub use query::{PageRequest, PaginationCursor, PhotoPage, QueryFilter, SortOrder};
pub use schema::{init_photo_schema, PHOTO_SCHEMA_VERSION};
pub use settings::{NOTE_HISTORY_KEY, NOTE_HISTORY_LIMIT};
pub use store::PhotoStore;
pub use thumbnail::{create_thumbnail, ThumbnailError};
pub use upload::{
    upload_records, validate_upload_request, HostRegistry, ProgressFn, ProviderSettings,
    RemoteHost, SummaryKind, UploadImage, UploadOrchestrator, UploadOutcome, UploadSummary,
    UploadValidation, ValidationResult, DEFAULT_CONCURRENCY,
};
