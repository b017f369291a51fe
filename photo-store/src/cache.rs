//! Short-lived memo of per-folder aggregates.
//!
//! The cache is owned by a [`crate::PhotoStore`] and invalidated by every
//! mutation the store performs. Rebuilds are full scans; there is no
//! per-folder delta tracking.

use crate::models::{Folder, FolderStats};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Number of photos per folder.
pub type FolderCounts = BTreeMap<Folder, usize>;

#[derive(Debug)]
struct Timed<T> {
    value: Arc<T>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    counts: Option<Timed<FolderCounts>>,
    stats: Option<Timed<Vec<FolderStats>>>,
    /// Bumped by every invalidation; rebuilds started under an older
    /// generation are discarded instead of stored.
    generation: u64,
}

/// Memoized folder counts and folder stats with a fixed TTL.
#[derive(Debug)]
pub struct AggregateCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl AggregateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state is plain data; a panic elsewhere cannot leave it half-written.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fresh<T>(&self, entry: &Option<Timed<T>>) -> Option<Arc<T>> {
        entry
            .as_ref()
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }

    /// Drops every cached aggregate.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.counts = None;
        state.stats = None;
        state.generation = state.generation.wrapping_add(1);
    }

    /// Generation to hand back to `store_*` after a rebuild scan.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn folder_counts(&self) -> Option<Arc<FolderCounts>> {
        let state = self.lock();
        self.fresh(&state.counts)
    }

    pub fn folder_stats(&self) -> Option<Arc<Vec<FolderStats>>> {
        let state = self.lock();
        self.fresh(&state.stats)
    }

    /// Stores rebuilt counts unless an invalidation happened since `generation`.
    pub fn store_folder_counts(&self, generation: u64, counts: FolderCounts) -> Arc<FolderCounts> {
        let value = Arc::new(counts);
        let mut state = self.lock();
        if state.generation == generation {
            state.counts = Some(Timed {
                value: Arc::clone(&value),
                stored_at: Instant::now(),
            });
        } else {
            log::debug!("Discarding folder counts rebuilt before an invalidation");
        }
        value
    }

    /// Stores rebuilt stats unless an invalidation happened since `generation`.
    pub fn store_folder_stats(
        &self,
        generation: u64,
        stats: Vec<FolderStats>,
    ) -> Arc<Vec<FolderStats>> {
        let value = Arc::new(stats);
        let mut state = self.lock();
        if state.generation == generation {
            state.stats = Some(Timed {
                value: Arc::clone(&value),
                stored_at: Instant::now(),
            });
        } else {
            log::debug!("Discarding folder stats rebuilt before an invalidation");
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        let state = self.lock();
        state.counts.is_none() && state.stats.is_none()
    }
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
