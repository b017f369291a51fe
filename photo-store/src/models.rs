use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of a stored photo (a ULID string).
pub type PhotoId = String;

/// Metadata persisted with every photo.
///
/// Only position and capture time are stored. Altitude, accuracy, heading and
/// tilt exist in [`crate::capture::SensorSnapshot`] for the watermark and are
/// never written to disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhotoMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Capture time in unix milliseconds; the sort key of the store.
    pub timestamp: i64,
}

impl PhotoMetadata {
    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Result of a successful upload to a remote image host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudData {
    pub url: String,
    pub viewer_url: String,
    pub delete_url: String,
    pub uploaded_at: i64,
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Folder a photo belongs to. Derived from the note, never stored.
///
/// Ordering puts named folders first (by name) and the uncategorized bucket last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Folder {
    Named(String),
    Uncategorized,
}

impl Folder {
    /// Derives the folder from a note: blank or missing notes are uncategorized.
    pub fn from_note(note: Option<&str>) -> Self {
        match note.map(str::trim) {
            Some(name) if !name.is_empty() => Folder::Named(name.to_string()),
            _ => Folder::Uncategorized,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Folder::Named(name) => Some(name),
            Folder::Uncategorized => None,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Folder::Named(name) => write!(f, "{}", name),
            Folder::Uncategorized => write!(f, "uncategorized"),
        }
    }
}

fn note_is_present(note: Option<&str>) -> bool {
    note.is_some_and(|n| !n.trim().is_empty())
}

/// A complete stored photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub image_data: Vec<u8>,
    pub thumbnail_data: Vec<u8>,
    pub metadata: PhotoMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudData>,
}

impl PhotoRecord {
    pub fn folder(&self) -> Folder {
        Folder::from_note(self.note.as_deref())
    }

    pub fn has_note(&self) -> bool {
        note_is_present(self.note.as_deref())
    }

    /// True once the record carries a cloud URL.
    pub fn is_uploaded(&self) -> bool {
        self.cloud.as_ref().is_some_and(|c| !c.url.is_empty())
    }

    /// Drops the full image, keeping the thumbnail for gallery views.
    pub fn into_thumbnail_view(self) -> PhotoWithThumbnail {
        PhotoWithThumbnail {
            id: self.id,
            thumbnail_data: self.thumbnail_data,
            metadata: self.metadata,
            note: self.note,
            cloud: self.cloud,
        }
    }
}

/// A photo without its full image payload (gallery grids, pagination).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoWithThumbnail {
    pub id: PhotoId,
    pub thumbnail_data: Vec<u8>,
    pub metadata: PhotoMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudData>,
}

impl PhotoWithThumbnail {
    pub fn folder(&self) -> Folder {
        Folder::from_note(self.note.as_deref())
    }

    pub fn has_note(&self) -> bool {
        note_is_present(self.note.as_deref())
    }

    pub fn is_uploaded(&self) -> bool {
        self.cloud.as_ref().is_some_and(|c| !c.url.is_empty())
    }
}

/// A photo without any binary payload (list views).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSummary {
    pub id: PhotoId,
    pub metadata: PhotoMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudData>,
}

impl PhotoSummary {
    pub fn folder(&self) -> Folder {
        Folder::from_note(self.note.as_deref())
    }

    pub fn is_uploaded(&self) -> bool {
        self.cloud.as_ref().is_some_and(|c| !c.url.is_empty())
    }
}

/// Input to [`crate::PhotoStore::create`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub image_data: Vec<u8>,
    pub thumbnail_data: Vec<u8>,
    pub metadata: PhotoMetadata,
    pub note: Option<String>,
}

/// Field-by-field update applied to a freshly read record.
///
/// `None` leaves a field untouched. Image payloads and metadata are immutable
/// and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoPatch {
    /// `Some(None)` removes the note (moving the photo to uncategorized).
    pub note: Option<Option<String>>,
    pub cloud: Option<CloudData>,
}

impl PhotoPatch {
    pub fn cloud(cloud: CloudData) -> Self {
        Self {
            cloud: Some(cloud),
            ..Self::default()
        }
    }

    pub fn note(note: Option<String>) -> Self {
        Self {
            note: Some(note),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.note.is_none() && self.cloud.is_none()
    }

    /// Returns a new record with the patched fields replaced.
    pub fn apply(self, record: PhotoRecord) -> PhotoRecord {
        PhotoRecord {
            note: match self.note {
                Some(note) => note,
                None => record.note,
            },
            cloud: self.cloud.or(record.cloud),
            ..record
        }
    }
}

/// Total number of photos and how many of them have been uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhotoCounts {
    pub total: u64,
    pub cloud: u64,
}

/// Per-folder aggregate maintained by the [`crate::cache::AggregateCache`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderStats {
    pub folder: Folder,
    pub count: usize,
    pub latest_thumbnail: Vec<u8>,
    pub latest_timestamp: i64,
    pub uploaded_count: usize,
}

/// Configuration for the photo store
#[derive(Debug, Clone)]
pub struct PhotoStoreConfig {
    /// How long folder aggregates stay valid without a mutation
    pub cache_ttl: Duration,
    /// Maximum records examined by one paginated query
    pub scan_ceiling: usize,
    /// Longest edge of generated thumbnails
    pub thumbnail_size: u32,
    pub jpeg_quality: u8,
}

impl Default for PhotoStoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            scan_ceiling: 10_000,
            thumbnail_size: 300,
            jpeg_quality: 92,
        }
    }
}
