//! Deduplication table
//!
//! Maps each identifier to the first secret seen for it. The check-then-insert
//! happens under a single lock so two callers can never both claim the same
//! identifier.

use ahash::RandomState;
use hashbrown::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Statistics for deduplication operations
#[derive(Debug, Default)]
pub struct DedupStats {
    /// Total candidates offered to the table
    pub total_processed: AtomicU64,
    /// Candidates that claimed a new identifier
    pub unique_count: AtomicU64,
    /// Candidates dropped because the identifier was already taken
    pub duplicate_count: AtomicU64,
}

impl DedupStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unique(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.unique_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.duplicate_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total(&self) -> u64 {
        self.total_processed.load(Ordering::Relaxed)
    }

    pub fn get_unique(&self) -> u64 {
        self.unique_count.load(Ordering::Relaxed)
    }

    pub fn get_duplicates(&self) -> u64 {
        self.duplicate_count.load(Ordering::Relaxed)
    }
}

/// Run-scoped `identifier -> secret` table where the first insert wins
pub struct DedupTable {
    entries: Mutex<HashMap<String, String, RandomState>>,
    stats: DedupStats,
}

impl DedupTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::with_hasher(RandomState::new())),
            stats: DedupStats::new(),
        }
    }

    // The map is never left half-updated, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String, RandomState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `identifier` for `secret`.
    ///
    /// Returns `true` if the identifier was absent and is now mapped to
    /// `secret`, `false` if an earlier insert already owns it (the stored
    /// secret is left untouched).
    pub fn insert_first(&self, identifier: &str, secret: &str) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(identifier) {
            drop(entries);
            self.stats.record_duplicate();
            return false;
        }
        entries.insert(identifier.to_owned(), secret.to_owned());
        drop(entries);
        self.stats.record_unique();
        true
    }

    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }
}

impl Default for DedupTable {
    fn default() -> Self {
        Self::new()
    }
}
