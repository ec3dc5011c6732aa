//! In-memory snapshot cache with TTL-based staleness.
//!
//! The cache is the single source of truth for reads while its snapshot is
//! fresh. A stale read reloads synchronously from the store; a reload
//! failure propagates to the caller rather than serving the stale copy
//! (freshness over availability).
//!
//! All mutations go through [`SnapshotCache::mutate`], which serializes
//! load-or-use-cached, mutate and flush behind one lock per cache instance.
//! Two concurrent mutations therefore never flush each other's work away.

use super::snapshot_store::{SnapshotStore, StoreError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Default snapshot validity window: 24 hours.
pub const DEFAULT_CACHE_TTL_MS: i64 = 24 * 3_600_000;

/// Millisecond clock, injectable so tests can step time across the TTL
/// boundary.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock used outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

struct CacheState<T> {
    snapshot: Vec<T>,
    /// Millis of the last successful sync with the store; `None` until the
    /// first load.
    last_sync: Option<i64>,
    /// Millis of the last read served from memory. Observability only,
    /// never used for eviction.
    last_access: i64,
}

/// TTL cache over one [`SnapshotStore`] document.
pub struct SnapshotCache<T> {
    store: Arc<dyn SnapshotStore<T>>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    state: Mutex<CacheState<T>>,
}

impl<T> SnapshotCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn SnapshotStore<T>>, ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl_ms,
            state: Mutex::new(CacheState {
                snapshot: Vec::new(),
                last_sync: None,
                last_access: 0,
            }),
        }
    }

    fn is_fresh(&self, state: &CacheState<T>, now: i64) -> bool {
        match state.last_sync {
            Some(last_sync) => now - last_sync < self.ttl_ms,
            None => false,
        }
    }

    /// Millis of the last read served from memory; observability only.
    pub async fn last_access_millis(&self) -> i64 {
        self.state.lock().await.last_access
    }

    /// Point-in-time snapshot: the in-memory copy when fresh, otherwise a
    /// synchronous reload from the store.
    pub async fn get(&self) -> Result<Vec<T>, StoreError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now_millis();
        if self.is_fresh(&state, now) {
            state.last_access = now;
            return Ok(state.snapshot.clone());
        }

        debug!("Cache stale, reloading snapshot from store");
        let snapshot = self.store.load().await?;
        state.snapshot = snapshot.clone();
        state.last_sync = Some(now);
        state.last_access = now;
        Ok(snapshot)
    }

    /// Single-writer mutation region: ensures a fresh snapshot, applies `f`
    /// to it, flushes the result to the store, and only then resets the
    /// validity window (store and cache are known-identical after a flush).
    ///
    /// `f` returns `None` to signal that it left the snapshot untouched
    /// (e.g. the mutation target was absent); no flush happens then.
    ///
    /// `f` runs while the cache lock is held; callers must keep anything
    /// expensive (encoding, disk writes of originals) outside of it.
    pub async fn mutate<F, R>(&self, f: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&mut Vec<T>) -> Option<R>,
    {
        let mut state = self.state.lock().await;
        let now = self.clock.now_millis();
        if !self.is_fresh(&state, now) {
            state.snapshot = self.store.load().await?;
            state.last_sync = Some(now);
        }

        let result = f(&mut state.snapshot);
        if result.is_none() {
            return Ok(None);
        }

        self.store.save(&state.snapshot).await?;
        state.last_sync = Some(self.clock.now_millis());
        Ok(result)
    }
}
