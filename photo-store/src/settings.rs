//! Settings collection: small keyed JSON blobs stored next to the photos.

use crate::error::StoreResult;
use crate::store::PhotoStore;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key of the note autocomplete history
pub const NOTE_HISTORY_KEY: &str = "note_history";

/// Maximum number of remembered notes
pub const NOTE_HISTORY_LIMIT: usize = 100;

impl PhotoStore {
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let data: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT data FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn put_setting<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, data, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![key, json],
            )?;
            Ok(())
        })?;
        log::debug!("Saved setting '{}'", key);
        Ok(())
    }

    /// Returns whether the key existed
    pub async fn delete_setting(&self, key: &str) -> StoreResult<bool> {
        let rows = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?)
        })?;
        Ok(rows > 0)
    }

    /// Previously used notes, most recent first
    pub async fn note_history(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .get_setting::<Vec<String>>(NOTE_HISTORY_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Remember a note for autocomplete.
    ///
    /// Blank notes are ignored. A note already present (compared case
    /// insensitively) keeps its position.
    pub async fn save_note_to_history(&self, note: &str) -> StoreResult<()> {
        let note = note.trim();
        if note.is_empty() {
            return Ok(());
        }

        let saved = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let data: Option<String> = tx
                .query_row(
                    "SELECT data FROM settings WHERE key = ?1",
                    params![NOTE_HISTORY_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            let mut history: Vec<String> = match data {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };

            let lowered = note.to_lowercase();
            if history.iter().any(|n| n.to_lowercase() == lowered) {
                return Ok(false);
            }
            history.insert(0, note.to_string());
            history.truncate(NOTE_HISTORY_LIMIT);

            tx.execute(
                "INSERT INTO settings (key, data, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![NOTE_HISTORY_KEY, serde_json::to_string(&history)?],
            )?;
            tx.commit()?;
            Ok(true)
        })?;

        if saved {
            log::debug!("Added '{}' to note history", note);
        }
        Ok(())
    }

    pub async fn clear_note_history(&self) -> StoreResult<()> {
        self.delete_setting(NOTE_HISTORY_KEY).await?;
        Ok(())
    }
}
