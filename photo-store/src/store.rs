use crate::cache::{AggregateCache, FolderCounts};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    CloudData, Folder, FolderStats, NewPhoto, PhotoCounts, PhotoMetadata, PhotoPatch, PhotoRecord,
    PhotoStoreConfig, PhotoSummary, PhotoWithThumbnail,
};
use crate::schema::init_photo_schema;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use ulid::Generator;

/// Columns shared by every projection, in mapping order.
pub(crate) const SUMMARY_COLUMNS: &str = "id, latitude, longitude, timestamp, note, \
     cloud_url, cloud_viewer_url, cloud_delete_url, cloud_uploaded_at, cloud_expires_at, cloud_provider";
pub(crate) const THUMBNAIL_COLUMNS: &str = "id, latitude, longitude, timestamp, note, \
     cloud_url, cloud_viewer_url, cloud_delete_url, cloud_uploaded_at, cloud_expires_at, cloud_provider, \
     thumbnail_data";
pub(crate) const RECORD_COLUMNS: &str = "id, latitude, longitude, timestamp, note, \
     cloud_url, cloud_viewer_url, cloud_delete_url, cloud_uploaded_at, cloud_expires_at, cloud_provider, \
     thumbnail_data, image_data";

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoMetadata> {
    Ok(PhotoMetadata {
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

fn cloud_from_row(row: &Row<'_>) -> rusqlite::Result<Option<CloudData>> {
    let url: Option<String> = row.get(5)?;
    let Some(url) = url else {
        return Ok(None);
    };
    Ok(Some(CloudData {
        url,
        viewer_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        delete_url: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        uploaded_at: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
        expires_at: row.get(9)?,
        provider: row.get(10)?,
    }))
}

impl TryFrom<&Row<'_>> for PhotoSummary {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(PhotoSummary {
            id: row.get(0)?,
            metadata: metadata_from_row(row)?,
            note: row.get(4)?,
            cloud: cloud_from_row(row)?,
        })
    }
}

impl TryFrom<&Row<'_>> for PhotoWithThumbnail {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(PhotoWithThumbnail {
            id: row.get(0)?,
            metadata: metadata_from_row(row)?,
            note: row.get(4)?,
            cloud: cloud_from_row(row)?,
            thumbnail_data: row.get(11)?,
        })
    }
}

impl TryFrom<&Row<'_>> for PhotoRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(PhotoRecord {
            id: row.get(0)?,
            metadata: metadata_from_row(row)?,
            note: row.get(4)?,
            cloud: cloud_from_row(row)?,
            thumbnail_data: row.get(11)?,
            image_data: row.get(12)?,
        })
    }
}

/// Durable on-device photo store.
///
/// Owns the SQLite connection and the aggregate cache. Every mutation
/// invalidates the cache before it returns, so a caller that awaited a
/// mutation never observes stale folder aggregates.
pub struct PhotoStore {
    conn: Mutex<Connection>,
    cache: AggregateCache,
    ids: Mutex<Generator>,
    config: PhotoStoreConfig,
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PhotoStore {
    /// Open (or create) a store backed by a database file
    pub fn open(path: impl AsRef<Path>, config: PhotoStoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        log::debug!("Opening photo store at {:?}", path);
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    /// Open a throwaway store, mainly for tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, PhotoStoreConfig::default())
    }

    /// Wrap an existing connection, creating the schema if needed
    pub fn with_connection(conn: Connection, config: PhotoStoreConfig) -> StoreResult<Self> {
        init_photo_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cache: AggregateCache::new(config.cache_ttl),
            ids: Mutex::new(Generator::new()),
            config,
        })
    }

    pub fn config(&self) -> &PhotoStoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// The lock is never held across an await point.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    fn next_id(&self) -> String {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        match ids.generate() {
            Ok(id) => id.to_string(),
            // Random part overflowed within one millisecond; a fresh ULID is
            // still unique, just not ordered against its neighbour.
            Err(_) => ulid::Ulid::new().to_string(),
        }
    }

    /// Persist a new photo, assigning its id
    pub async fn create(&self, photo: NewPhoto) -> StoreResult<PhotoRecord> {
        let record = PhotoRecord {
            id: self.next_id(),
            image_data: photo.image_data,
            thumbnail_data: photo.thumbnail_data,
            metadata: photo.metadata,
            note: photo.note,
            cloud: None,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO photos (id, image_data, thumbnail_data, latitude, longitude, timestamp, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &record.id,
                    &record.image_data,
                    &record.thumbnail_data,
                    record.metadata.latitude,
                    record.metadata.longitude,
                    record.metadata.timestamp,
                    &record.note,
                ],
            )?;
            Ok(())
        })?;
        self.cache.invalidate();

        log::debug!(
            "Stored photo {} ({} bytes, folder {})",
            record.id,
            record.image_data.len(),
            record.folder()
        );
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<PhotoRecord>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM photos WHERE id = ?1", RECORD_COLUMNS);
            Ok(conn
                .query_row(&sql, params![id], |row| PhotoRecord::try_from(row))
                .optional()?)
        })
    }

    /// Thumbnail bytes only, without loading the full image
    pub async fn get_thumbnail(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT thumbnail_data FROM photos WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    /// Full image bytes only
    pub async fn get_image_data(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT image_data FROM photos WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    /// Apply `patch` to the current version of a record and rewrite it.
    ///
    /// Read and write happen in one transaction under the connection lock, so
    /// concurrent updates of the same id are applied one after the other and
    /// fields the later patch does not touch keep the earlier value.
    pub async fn update(&self, id: &str, patch: PhotoPatch) -> StoreResult<PhotoRecord> {
        let updated = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let sql = format!("SELECT {} FROM photos WHERE id = ?1", RECORD_COLUMNS);
            let current = tx
                .query_row(&sql, params![id], |row| PhotoRecord::try_from(row))
                .optional()?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            let updated = patch.apply(current);
            let cloud = updated.cloud.as_ref();
            tx.execute(
                "UPDATE photos
                 SET image_data = ?2, thumbnail_data = ?3, latitude = ?4, longitude = ?5,
                     timestamp = ?6, note = ?7, cloud_url = ?8, cloud_viewer_url = ?9,
                     cloud_delete_url = ?10, cloud_uploaded_at = ?11, cloud_expires_at = ?12,
                     cloud_provider = ?13
                 WHERE id = ?1",
                params![
                    &updated.id,
                    &updated.image_data,
                    &updated.thumbnail_data,
                    updated.metadata.latitude,
                    updated.metadata.longitude,
                    updated.metadata.timestamp,
                    &updated.note,
                    cloud.map(|c| &c.url),
                    cloud.map(|c| &c.viewer_url),
                    cloud.map(|c| &c.delete_url),
                    cloud.map(|c| c.uploaded_at),
                    cloud.and_then(|c| c.expires_at),
                    cloud.and_then(|c| c.provider.as_ref()),
                ],
            )?;
            tx.commit()?;
            Ok(updated)
        })?;
        self.cache.invalidate();
        Ok(updated)
    }

    /// Remove a photo. Returns whether a record was actually deleted.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let rows = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?)
        })?;
        self.cache.invalidate();

        if rows == 0 {
            log::debug!("Delete of unknown photo {}", id);
        }
        Ok(rows > 0)
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }

    /// Remove every photo. Settings are kept.
    pub async fn clear(&self) -> StoreResult<()> {
        let removed = self.with_conn(|conn| Ok(conn.execute("DELETE FROM photos", [])?))?;
        self.cache.invalidate();
        log::info!("Cleared {} photos", removed);
        Ok(())
    }

    /// Newest photo by capture time
    pub async fn latest(&self) -> StoreResult<Option<PhotoRecord>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM photos ORDER BY timestamp DESC, id DESC LIMIT 1",
                RECORD_COLUMNS
            );
            Ok(conn
                .query_row(&sql, [], |row| PhotoRecord::try_from(row))
                .optional()?)
        })
    }

    pub async fn cloud_uploaded_count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM photos WHERE cloud_url IS NOT NULL AND cloud_url != ''",
                [],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }

    pub async fn photo_counts(&self) -> StoreResult<PhotoCounts> {
        Ok(PhotoCounts {
            total: self.count().await?,
            cloud: self.cloud_uploaded_count().await?,
        })
    }

    /// Drop cached folder aggregates
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Photo count per folder, served from the cache while fresh.
    ///
    /// A failing scan propagates the store error and leaves the cache empty.
    pub async fn folder_counts(&self) -> StoreResult<Arc<FolderCounts>> {
        if let Some(counts) = self.cache.folder_counts() {
            return Ok(counts);
        }

        let generation = self.cache.generation();
        let counts = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT note FROM photos")?;
            let mut rows = stmt.query([])?;
            let mut counts = FolderCounts::new();
            while let Some(row) = rows.next()? {
                let note: Option<String> = row.get(0)?;
                *counts.entry(Folder::from_note(note.as_deref())).or_insert(0) += 1;
            }
            Ok(counts)
        })?;

        log::debug!("Rebuilt folder counts: {} folders", counts.len());
        Ok(self.cache.store_folder_counts(generation, counts))
    }

    /// Per-folder count, uploaded count and latest thumbnail, sorted by
    /// folder name with the uncategorized folder last.
    pub async fn folder_stats(&self) -> StoreResult<Arc<Vec<FolderStats>>> {
        if let Some(stats) = self.cache.folder_stats() {
            return Ok(stats);
        }

        let generation = self.cache.generation();
        let stats = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT note, timestamp, cloud_url, thumbnail_data FROM photos")?;
            let mut rows = stmt.query([])?;
            let mut folders: BTreeMap<Folder, FolderStats> = BTreeMap::new();

            while let Some(row) = rows.next()? {
                let note: Option<String> = row.get(0)?;
                let timestamp: i64 = row.get(1)?;
                let cloud_url: Option<String> = row.get(2)?;
                let uploaded = cloud_url.is_some_and(|u| !u.is_empty());
                let folder = Folder::from_note(note.as_deref());

                match folders.get_mut(&folder) {
                    Some(entry) => {
                        entry.count += 1;
                        if uploaded {
                            entry.uploaded_count += 1;
                        }
                        if timestamp > entry.latest_timestamp {
                            entry.latest_timestamp = timestamp;
                            entry.latest_thumbnail = row.get(3)?;
                        }
                    }
                    None => {
                        folders.insert(
                            folder.clone(),
                            FolderStats {
                                folder,
                                count: 1,
                                latest_thumbnail: row.get(3)?,
                                latest_timestamp: timestamp,
                                uploaded_count: usize::from(uploaded),
                            },
                        );
                    }
                }
            }
            Ok(folders.into_values().collect::<Vec<_>>())
        })?;

        log::debug!("Rebuilt folder stats: {} folders", stats.len());
        Ok(self.cache.store_folder_stats(generation, stats))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn new_photo(timestamp: i64, note: Option<&str>) -> NewPhoto {
        NewPhoto {
            image_data: format!("image-{}", timestamp).into_bytes(),
            thumbnail_data: format!("thumb-{}", timestamp).into_bytes(),
            metadata: PhotoMetadata {
                latitude: None,
                longitude: None,
                timestamp,
            },
            note: note.map(str::to_string),
        }
    }

    pub(crate) fn cloud(url: &str) -> CloudData {
        CloudData {
            url: url.to_string(),
            viewer_url: format!("{}/view", url),
            delete_url: format!("{}/delete", url),
            uploaded_at: 1_700_000_000_000,
            expires_at: None,
            provider: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = PhotoStore::open_in_memory().unwrap();
        let created = store.create(new_photo(100, Some("Trips"))).await.unwrap();

        let loaded = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(
            store.get_thumbnail(&created.id).await.unwrap(),
            Some(b"thumb-100".to_vec())
        );
        assert_eq!(
            store.get_image_data(&created.id).await.unwrap(),
            Some(b"image-100".to_vec())
        );
        assert!(store.get("missing").await.unwrap().is_none());
        assert!(store.get_thumbnail("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let store = PhotoStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..50 {
            ids.push(store.create(new_photo(i, None)).await.unwrap().id);
        }
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = PhotoStore::open_in_memory().unwrap();
        let created = store.create(new_photo(100, Some("Trips"))).await.unwrap();

        let updated = store
            .update(&created.id, PhotoPatch::cloud(cloud("https://img.example/a")))
            .await
            .unwrap();
        assert_eq!(updated.note.as_deref(), Some("Trips"));
        assert!(updated.is_uploaded());

        let loaded = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.image_data, created.image_data);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = PhotoStore::open_in_memory().unwrap();
        let result = store.update("nope", PhotoPatch::note(None)).await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_fields() {
        let store = Arc::new(PhotoStore::open_in_memory().unwrap());
        let created = store.create(new_photo(100, None)).await.unwrap();

        let a = {
            let store = Arc::clone(&store);
            let id = created.id.clone();
            tokio::spawn(async move {
                store
                    .update(&id, PhotoPatch::note(Some("Work".into())))
                    .await
            })
        };
        let b = {
            let store = Arc::clone(&store);
            let id = created.id.clone();
            tokio::spawn(async move {
                store
                    .update(&id, PhotoPatch::cloud(cloud("https://img.example/b")))
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let loaded = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.note.as_deref(), Some("Work"));
        assert!(loaded.is_uploaded());
    }

    #[tokio::test]
    async fn test_delete_count_and_clear() {
        let store = PhotoStore::open_in_memory().unwrap();
        let a = store.create(new_photo(1, None)).await.unwrap();
        store.create(new_photo(2, None)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        assert!(store.delete(&a.id).await.unwrap());
        assert!(!store.delete(&a.id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_latest_and_counts() {
        let store = PhotoStore::open_in_memory().unwrap();
        assert!(store.latest().await.unwrap().is_none());

        store.create(new_photo(300, None)).await.unwrap();
        let newest = store.create(new_photo(900, None)).await.unwrap();
        store.create(new_photo(500, None)).await.unwrap();
        store
            .update(&newest.id, PhotoPatch::cloud(cloud("https://img.example/n")))
            .await
            .unwrap();

        assert_eq!(store.latest().await.unwrap().unwrap().id, newest.id);
        assert_eq!(
            store.photo_counts().await.unwrap(),
            PhotoCounts { total: 3, cloud: 1 }
        );
    }

    #[tokio::test]
    async fn test_folder_counts_follow_every_mutation() {
        let store = PhotoStore::open_in_memory().unwrap();
        let trip = store.create(new_photo(1, Some("Trips"))).await.unwrap();
        store.create(new_photo(2, None)).await.unwrap();

        let counts = store.folder_counts().await.unwrap();
        assert_eq!(counts.get(&Folder::Named("Trips".into())), Some(&1));
        assert_eq!(counts.get(&Folder::Uncategorized), Some(&1));

        // create
        store.create(new_photo(3, Some("Trips"))).await.unwrap();
        let counts = store.folder_counts().await.unwrap();
        assert_eq!(counts.get(&Folder::Named("Trips".into())), Some(&2));

        // update
        store
            .update(&trip.id, PhotoPatch::note(Some("  ".into())))
            .await
            .unwrap();
        let counts = store.folder_counts().await.unwrap();
        assert_eq!(counts.get(&Folder::Named("Trips".into())), Some(&1));
        assert_eq!(counts.get(&Folder::Uncategorized), Some(&2));

        // delete
        store.delete(&trip.id).await.unwrap();
        let counts = store.folder_counts().await.unwrap();
        assert_eq!(counts.get(&Folder::Uncategorized), Some(&1));

        // clear
        store.clear().await.unwrap();
        assert!(store.folder_counts().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_folder_counts_are_memoized_within_ttl() {
        let store = PhotoStore::open_in_memory().unwrap();
        store.create(new_photo(1, Some("Trips"))).await.unwrap();
        assert_eq!(store.folder_counts().await.unwrap().len(), 1);

        // A write that bypasses the store API is invisible until the TTL runs out.
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO photos (id, image_data, thumbnail_data, timestamp, note)
                     VALUES ('raw', x'00', x'00', 2, 'Work')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.folder_counts().await.unwrap().len(), 1);

        tokio::time::advance(store.cache().ttl() + std::time::Duration::from_millis(1)).await;
        assert_eq!(store.folder_counts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_invalidation_rebuilds_identically() {
        let store = PhotoStore::open_in_memory().unwrap();
        store.create(new_photo(1, Some("A"))).await.unwrap();
        store.create(new_photo(2, Some("B"))).await.unwrap();
        store.create(new_photo(3, None)).await.unwrap();

        store.invalidate_cache();
        let first = store.folder_stats().await.unwrap();
        store.invalidate_cache();
        store.invalidate_cache();
        let second = store.folder_stats().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_folder_stats() {
        let store = PhotoStore::open_in_memory().unwrap();
        store.create(new_photo(10, Some("Trips"))).await.unwrap();
        let newest_trip = store.create(new_photo(30, Some("Trips"))).await.unwrap();
        store.create(new_photo(20, Some("Trips"))).await.unwrap();
        let lone = store.create(new_photo(5, None)).await.unwrap();
        store.create(new_photo(7, Some("Alpha"))).await.unwrap();
        store
            .update(&newest_trip.id, PhotoPatch::cloud(cloud("https://img.example/t")))
            .await
            .unwrap();

        let stats = store.folder_stats().await.unwrap();
        let folders: Vec<_> = stats.iter().map(|s| s.folder.clone()).collect();
        assert_eq!(
            folders,
            vec![
                Folder::Named("Alpha".into()),
                Folder::Named("Trips".into()),
                Folder::Uncategorized
            ]
        );

        let trips = &stats[1];
        assert_eq!(trips.count, 3);
        assert_eq!(trips.uploaded_count, 1);
        assert_eq!(trips.latest_timestamp, 30);
        assert_eq!(trips.latest_thumbnail, b"thumb-30".to_vec());

        // Deleting the last photo of a folder removes the folder.
        store.delete(&lone.id).await.unwrap();
        let stats = store.folder_stats().await.unwrap();
        assert!(stats.iter().all(|s| s.folder != Folder::Uncategorized));
    }

    #[tokio::test]
    async fn test_failed_scan_leaves_cache_empty() {
        let store = PhotoStore::open_in_memory().unwrap();
        store.create(new_photo(1, None)).await.unwrap();
        store.invalidate_cache();

        store
            .with_conn(|conn| {
                conn.execute("DROP TABLE photos", [])?;
                Ok(())
            })
            .unwrap();

        let result = store.folder_counts().await;
        assert!(matches!(result, Err(ref e) if e.is_storage_unavailable()));
        assert!(store.cache().is_empty());

        let result = store.create(new_photo(2, None)).await;
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));

        store.with_conn(|conn| Ok(init_photo_schema(conn)?)).unwrap();
        assert!(store.folder_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photos.db");

        let id = {
            let store = PhotoStore::open(&path, PhotoStoreConfig::default()).unwrap();
            store.create(new_photo(42, Some("Kept"))).await.unwrap().id
        };

        let store = PhotoStore::open(&path, PhotoStoreConfig::default()).unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.note.as_deref(), Some("Kept"));
        assert_eq!(loaded.metadata.timestamp, 42);
    }
}
