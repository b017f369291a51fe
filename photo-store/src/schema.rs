use rusqlite::{Connection, Result};

/// Current version of the photo store schema
pub const PHOTO_SCHEMA_VERSION: i32 = 1;

/// Initialize photo store database schema
///
/// Safe to call on every start: missing tables and indexes are created,
/// existing ones are left alone.
pub fn init_photo_schema(conn: &Connection) -> Result<()> {
    // Schema version table for the photo store
    conn.execute(
        "CREATE TABLE IF NOT EXISTS photo_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version = schema_version(conn)?;

    if current_version < 1 {
        create_photo_schema_v1(conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO photo_schema_version (version) VALUES (1)",
            [],
        )?;
    } else {
        // Tables may have been dropped by hand; indexes are recreated idempotently.
        create_photo_schema_v1(conn)?;
    }

    Ok(())
}

/// Highest applied schema version, 0 for a fresh database
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM photo_schema_version",
        [],
        |row| row.get(0),
    )
}

/// Create photo store schema version 1
fn create_photo_schema_v1(conn: &Connection) -> Result<()> {
    // Table: photos - one row per captured photo
    conn.execute(
        "CREATE TABLE IF NOT EXISTS photos (
            id TEXT PRIMARY KEY,
            image_data BLOB NOT NULL,
            thumbnail_data BLOB NOT NULL,
            latitude REAL,
            longitude REAL,
            timestamp INTEGER NOT NULL,
            note TEXT,
            cloud_url TEXT,
            cloud_viewer_url TEXT,
            cloud_delete_url TEXT,
            cloud_uploaded_at INTEGER,
            cloud_expires_at INTEGER,
            cloud_provider TEXT
        )",
        [],
    )?;

    // Secondary ordering used by cursor pagination
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_photos_timestamp ON photos(timestamp, id)",
        [],
    )?;

    // Table: settings - small keyed JSON blobs (app settings, note history)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_photo_schema(&conn).unwrap();
        init_photo_schema(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), PHOTO_SCHEMA_VERSION);

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM photo_schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_missing_index_is_recreated() {
        let conn = Connection::open_in_memory().unwrap();
        init_photo_schema(&conn).unwrap();
        conn.execute("DROP INDEX idx_photos_timestamp", []).unwrap();

        init_photo_schema(&conn).unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='index' AND name='idx_photos_timestamp'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists);
    }
}
