//! Cursor pagination over the timestamp index, plus the unbounded full-scan
//! reads used by folder views.

use crate::error::{StoreError, StoreResult};
use crate::models::{Folder, PhotoId, PhotoRecord, PhotoSummary, PhotoWithThumbnail};
use crate::store::{PhotoStore, RECORD_COLUMNS, SUMMARY_COLUMNS, THUMBNAIL_COLUMNS};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rusqlite::types::Value;
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Newest => "ORDER BY timestamp DESC, id DESC",
            SortOrder::Oldest => "ORDER BY timestamp ASC, id ASC",
        }
    }

    fn beyond(self) -> &'static str {
        match self {
            SortOrder::Newest => "<",
            SortOrder::Oldest => ">",
        }
    }
}

/// Position after the last record of a page.
///
/// The scan resumes strictly past `(timestamp, id)` in the cursor's
/// direction. Without an id every record at `timestamp` is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PhotoId>,
    pub sort: SortOrder,
}

impl PaginationCursor {
    pub fn at(timestamp: i64, sort: SortOrder) -> Self {
        Self {
            timestamp,
            id: None,
            sort,
        }
    }

    fn after(summary: &PhotoSummary, sort: SortOrder) -> Self {
        Self {
            timestamp: summary.metadata.timestamp,
            id: Some(summary.id.clone()),
            sort,
        }
    }

    /// Opaque token handed to clients
    pub fn to_token(&self) -> String {
        // Serializing a plain struct of strings and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn from_token(token: &str) -> StoreResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
    }
}

/// Predicates applied in order to every scanned record. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    pub folder: Option<Folder>,
    pub has_location: Option<bool>,
    pub has_note: Option<bool>,
}

impl QueryFilter {
    pub fn folder(folder: Folder) -> Self {
        Self {
            folder: Some(folder),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folder.is_none() && self.has_location.is_none() && self.has_note.is_none()
    }

    pub fn matches(&self, photo: &PhotoSummary) -> bool {
        if let Some(folder) = &self.folder {
            if Folder::from_note(photo.note.as_deref()) != *folder {
                return false;
            }
        }
        if let Some(has_location) = self.has_location {
            if photo.metadata.has_location() != has_location {
                return false;
            }
        }
        if let Some(has_note) = self.has_note {
            let present = photo.note.as_deref().is_some_and(|n| !n.trim().is_empty());
            if present != has_note {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub sort: SortOrder,
    pub limit: usize,
    pub cursor: Option<PaginationCursor>,
    pub filter: QueryFilter,
}

impl PageRequest {
    pub fn new(sort: SortOrder, limit: usize) -> Self {
        Self {
            sort,
            limit,
            ..Self::default()
        }
    }

    pub fn after(mut self, cursor: Option<PaginationCursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPage {
    pub items: Vec<PhotoWithThumbnail>,
    pub next_cursor: Option<PaginationCursor>,
    pub has_more: bool,
    /// Matches seen from the cursor onwards, exact only below the scan ceiling.
    pub total_matching_count: usize,
    /// The scan stopped at the ceiling before running out of records.
    pub scan_ceiling_reached: bool,
}

impl PhotoPage {
    /// Cursor for the next call, if there may be more to read.
    ///
    /// Unlike `has_more` this also continues past a scan ceiling, where
    /// matches beyond the scanned window are unknown.
    pub fn resume_cursor(&self) -> Option<&PaginationCursor> {
        if self.has_more || self.scan_ceiling_reached {
            self.next_cursor.as_ref()
        } else {
            None
        }
    }
}

fn range_clause(cursor: Option<&PaginationCursor>, sort: SortOrder) -> (String, Vec<Value>) {
    match cursor {
        None => (String::new(), Vec::new()),
        Some(PaginationCursor {
            timestamp,
            id: None,
            ..
        }) => (
            format!("WHERE timestamp {} ?1", sort.beyond()),
            vec![Value::Integer(*timestamp)],
        ),
        Some(PaginationCursor {
            timestamp,
            id: Some(id),
            ..
        }) => (
            format!(
                "WHERE (timestamp {op} ?1 OR (timestamp = ?1 AND id {op} ?2))",
                op = sort.beyond()
            ),
            vec![Value::Integer(*timestamp), Value::Text(id.clone())],
        ),
    }
}

impl PhotoStore {
    /// One page of thumbnails in timestamp order.
    ///
    /// Records are read lazily from the index; at most `scan_ceiling` rows are
    /// examined per call. Matches past a full page are still counted towards
    /// `total_matching_count`.
    pub async fn query_page(&self, request: PageRequest) -> StoreResult<PhotoPage> {
        let PageRequest {
            sort,
            limit,
            cursor,
            filter,
        } = request;
        if let Some(cursor) = &cursor {
            if cursor.sort != sort {
                return Err(StoreError::InvalidCursor(format!(
                    "cursor was issued for {:?} order, page requested {:?}",
                    cursor.sort, sort
                )));
            }
        }
        let limit = limit.max(1);
        let ceiling = self.config().scan_ceiling;

        let page = self.with_conn(|conn| {
            let (clause, values) = range_clause(cursor.as_ref(), sort);
            let sql = format!(
                "SELECT {} FROM photos {} {}",
                THUMBNAIL_COLUMNS,
                clause,
                sort.sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(values))?;

            let mut items: Vec<PhotoWithThumbnail> = Vec::with_capacity(limit.min(64));
            let mut total = 0usize;
            let mut scanned = 0usize;
            let mut last_scanned: Option<PaginationCursor> = None;
            let mut ceiling_reached = false;

            while let Some(row) = rows.next()? {
                if scanned >= ceiling {
                    ceiling_reached = true;
                    break;
                }
                scanned += 1;

                let summary = PhotoSummary::try_from(row)?;
                let page_open = items.len() < limit;
                if page_open {
                    last_scanned = Some(PaginationCursor::after(&summary, sort));
                }
                if filter.matches(&summary) {
                    total += 1;
                    if page_open {
                        items.push(PhotoWithThumbnail {
                            thumbnail_data: row.get(11)?,
                            id: summary.id,
                            metadata: summary.metadata,
                            note: summary.note,
                            cloud: summary.cloud,
                        });
                    }
                }
            }

            let page_full = items.len() == limit;
            let next_cursor = if !page_full && ceiling_reached {
                // Short page cut by the ceiling: resume after the last examined row.
                last_scanned
            } else {
                items.last().map(|last| PaginationCursor {
                    timestamp: last.metadata.timestamp,
                    id: Some(last.id.clone()),
                    sort,
                })
            };

            Ok(PhotoPage {
                has_more: page_full && total > items.len(),
                items,
                next_cursor,
                total_matching_count: total,
                scan_ceiling_reached: ceiling_reached,
            })
        })?;

        log::debug!(
            "Page query ({:?}, limit {}): {} items, {} matches, ceiling reached: {}",
            sort,
            limit,
            page.items.len(),
            page.total_matching_count,
            page.scan_ceiling_reached
        );
        Ok(page)
    }

    fn scan<T>(
        &self,
        columns: &str,
        sort: SortOrder,
        map: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM photos {}", columns, sort.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| map(row))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Every record including image data. Unbounded.
    pub async fn all_photos(&self, sort: SortOrder) -> StoreResult<Vec<PhotoRecord>> {
        self.scan(RECORD_COLUMNS, sort, |row| PhotoRecord::try_from(row))
    }

    pub async fn photo_ids(&self, sort: SortOrder) -> StoreResult<Vec<PhotoId>> {
        self.scan("id", sort, |row| row.get(0))
    }

    /// Every record without image or thumbnail bytes
    pub async fn photo_summaries(&self, sort: SortOrder) -> StoreResult<Vec<PhotoSummary>> {
        self.scan(SUMMARY_COLUMNS, sort, |row| PhotoSummary::try_from(row))
    }

    /// Every record with its thumbnail but without the full image
    pub async fn photos_with_thumbnails(
        &self,
        sort: SortOrder,
    ) -> StoreResult<Vec<PhotoWithThumbnail>> {
        self.scan(THUMBNAIL_COLUMNS, sort, |row| PhotoWithThumbnail::try_from(row))
    }

    pub async fn photos_by_folder(
        &self,
        folder: &Folder,
        sort: SortOrder,
    ) -> StoreResult<Vec<PhotoWithThumbnail>> {
        let photos = self.photos_with_thumbnails(sort).await?;
        Ok(photos
            .into_iter()
            .filter(|p| p.folder() == *folder)
            .collect())
    }

    /// Named folders in sorted order; the uncategorized bucket is not listed.
    pub async fn folders(&self) -> StoreResult<Vec<String>> {
        let counts = self.folder_counts().await?;
        Ok(counts
            .keys()
            .filter_map(|f| f.name().map(str::to_string))
            .collect())
    }

    /// Number of records matching `filter`, without a scan ceiling.
    pub async fn filtered_count(&self, filter: &QueryFilter) -> StoreResult<usize> {
        let summaries = self.photo_summaries(SortOrder::Newest).await?;
        Ok(summaries.iter().filter(|s| filter.matches(s)).count())
    }
}
