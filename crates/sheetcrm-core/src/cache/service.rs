//! Read-through cache and fetch coordination over the remote row store.
//!
//! Every dataset read in the system goes through [`CacheService::fetch`]:
//! a fresh cache entry is served directly, a stale or missing one triggers
//! exactly one remote fetch no matter how many callers arrive concurrently,
//! and mutations mark entries stale through [`CacheService::invalidate`],
//! which also advances the global write clock that polling clients watch.
//!
//! The service is an explicitly constructed instance owned by the
//! composition root and shared as an `Arc`; there is no global state.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::api::{ApiError, RowStore};
use crate::data::datasets::{Dataset, DatasetKey};
use crate::models::SheetRecord;

/// Type-erased parsed dataset. Each [`DatasetKey`] has exactly one record
/// type (one `Dataset` impl per key), so the payload behind a key always
/// downcasts to that type.
type CachedPayload = Arc<dyn Any + Send + Sync>;

/// An in-flight fetch that late arrivals can await alongside the caller
/// that started it.
type SharedFetch = Shared<BoxFuture<'static, CachedPayload>>;

/// One cache slot. `data == None` means the slot has never been populated;
/// `timestamp == 0` means stale regardless of `data` (the data is kept as a
/// fallback for failed refreshes).
#[derive(Default)]
struct CacheEntry {
    data: Option<CachedPayload>,
    timestamp: i64,
}

struct CacheState {
    entries: HashMap<DatasetKey, CacheEntry>,
    pending: HashMap<DatasetKey, SharedFetch>,
    /// Epoch millis of the most recent invalidation, non-decreasing
    global_last_write: i64,
}

/// Removes the pending-fetch marker when the fetch settles, whatever the
/// outcome (including a panic unwinding through the fetch task).
struct PendingGuard {
    state: Arc<Mutex<CacheState>>,
    key: DatasetKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.state.lock().pending.remove(&self.key);
    }
}

/// Result of a direct row lookup: the raw cells and the 1-based sheet row
/// (header row is row 1).
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatch {
    pub row_data: Vec<String>,
    pub row_index: usize,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct CacheService<S: RowStore> {
    store: Arc<S>,
    ttl_ms: i64,
    state: Arc<Mutex<CacheState>>,
}

impl<S: RowStore> CacheService<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            store,
            ttl_ms: ttl.as_millis() as i64,
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                pending: HashMap::new(),
                global_last_write: now_millis(),
            })),
        }
    }

    /// Current records for dataset `D`, from cache when fresh.
    ///
    /// Concurrent callers for the same stale or missing dataset share a
    /// single remote fetch and observe the same result. Remote failures
    /// never surface here: a missing range is cached as an empty dataset,
    /// and any other failure falls back to the last known data (or an empty
    /// sequence when there is none).
    pub async fn fetch<D: Dataset>(&self) -> Arc<Vec<D::Record>> {
        let shared = {
            // The check-then-act below must be one critical section: the
            // pending marker is registered before any suspension point, so
            // a second caller can never slip in between the miss and the
            // registration.
            let mut state = self.state.lock();

            let now = now_millis();
            let entry = state.entries.entry(D::KEY).or_default();
            if let Some(ref data) = entry.data {
                if now - entry.timestamp < self.ttl_ms {
                    if let Ok(records) = Arc::clone(data).downcast::<Vec<D::Record>>() {
                        debug!(key = %D::KEY, "Cache hit");
                        return records;
                    }
                }
            }

            if let Some(pending) = state.pending.get(&D::KEY) {
                debug!(key = %D::KEY, "Joining in-flight fetch");
                pending.clone()
            } else {
                debug!(key = %D::KEY, range = D::RANGE, "Fetching from row store");
                let shared = self.spawn_fetch::<D>();
                state.pending.insert(D::KEY, shared.clone());
                shared
            }
        };

        let payload = shared.await;
        payload
            .downcast::<Vec<D::Record>>()
            .unwrap_or_else(|_| Arc::new(Vec::new()))
    }

    /// Start the remote fetch as a spawned task so it runs to completion
    /// even if every awaiting caller goes away.
    fn spawn_fetch<D: Dataset>(&self) -> SharedFetch {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            let _guard = PendingGuard {
                state: Arc::clone(&state),
                key: D::KEY,
            };

            match store.get_range(D::RANGE).await {
                Ok(rows) => {
                    let records = Arc::new(parse_rows::<D>(rows));
                    debug!(key = %D::KEY, count = records.len(), "Cache updated");
                    state.lock().entries.insert(
                        D::KEY,
                        CacheEntry {
                            data: Some(records.clone() as CachedPayload),
                            timestamp: now_millis(),
                        },
                    );
                    records as CachedPayload
                }
                Err(e) if e.is_addressing() => {
                    // The sheet simply is not there; an empty dataset is
                    // the correct answer and is cacheable.
                    warn!(key = %D::KEY, range = D::RANGE, "Range missing, caching empty dataset");
                    let empty: Arc<Vec<D::Record>> = Arc::new(Vec::new());
                    state.lock().entries.insert(
                        D::KEY,
                        CacheEntry {
                            data: Some(empty.clone() as CachedPayload),
                            timestamp: now_millis(),
                        },
                    );
                    empty as CachedPayload
                }
                Err(e) => {
                    // Transient failure: serve the last known data, leave
                    // the entry untouched so the next read retries.
                    warn!(key = %D::KEY, error = %e, "Fetch failed, serving last known data");
                    let state = state.lock();
                    state
                        .entries
                        .get(&D::KEY)
                        .and_then(|entry| entry.data.clone())
                        .unwrap_or_else(|| Arc::new(Vec::<D::Record>::new()) as CachedPayload)
                }
            }
        });

        task.map(|res| {
            res.unwrap_or_else(|e| {
                error!(error = %e, "Fetch task failed");
                Arc::new(Vec::<D::Record>::new()) as CachedPayload
            })
        })
        .boxed()
        .shared()
    }

    /// Mark one cache entry stale, or all of them when `key` is `None`.
    ///
    /// Either way the global write clock advances, so polling clients learn
    /// that their view is outdated. Stale entries keep their data as a
    /// fallback for failed refreshes.
    pub fn invalidate(&self, key: Option<DatasetKey>) {
        let mut state = self.state.lock();
        match key {
            Some(key) => {
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.timestamp = 0;
                }
                debug!(%key, "Cache invalidated");
            }
            None => {
                for entry in state.entries.values_mut() {
                    entry.timestamp = 0;
                }
                debug!("All caches invalidated");
            }
        }

        // Strictly increasing: back-to-back writes within one millisecond
        // (or a wall clock stepping backwards) must still be observable to
        // pollers comparing snapshots.
        let now = now_millis();
        state.global_last_write = now.max(state.global_last_write + 1);
        debug!(timestamp = state.global_last_write, "Global write clock advanced");
    }

    /// Epoch millis of the most recent write, for the status surface that
    /// polling clients compare their snapshot against.
    pub fn last_write_timestamp(&self) -> i64 {
        self.state.lock().global_last_write
    }

    /// Direct, uncached lookup of the first row whose cell at
    /// `column_index` equals `value` case-insensitively.
    ///
    /// Returns `Ok(None)` when nothing matches or the range does not exist.
    /// Unlike [`fetch`](Self::fetch), unexpected errors are returned to the
    /// caller, who needs to tell "not found" apart from "lookup failed".
    pub async fn find_row_by_value(
        &self,
        range: &str,
        column_index: usize,
        value: &str,
    ) -> Result<Option<RowMatch>, ApiError> {
        let rows = match self.store.get_range(range).await {
            Ok(rows) => rows,
            Err(e) if e.is_addressing() => return Ok(None),
            Err(e) => {
                error!(range, error = %e, "Row lookup failed");
                return Err(e);
            }
        };

        if let Some(header) = rows.first() {
            if column_index >= header.len() {
                return Ok(None);
            }
        }

        let needle = value.to_lowercase();
        for (i, row) in rows.iter().enumerate().skip(1) {
            if let Some(cell) = row.get(column_index) {
                if cell.to_lowercase() == needle {
                    return Ok(Some(RowMatch {
                        row_data: row.clone(),
                        row_index: i + 1,
                    }));
                }
            }
        }
        Ok(None)
    }
}

/// Drop the header row, parse the rest, assign sheet row indices to records
/// whose parser left them unset, and apply the dataset's ordering.
fn parse_rows<D: Dataset>(rows: Vec<Vec<String>>) -> Vec<D::Record> {
    if rows.len() <= 1 {
        return Vec::new();
    }

    let mut records: Vec<D::Record> = rows[1..]
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let mut record = D::parse_row(row, index)?;
            if record.row_index().is_none() {
                // Header is sheet row 1, so data row 0 lives at sheet row 2
                record.set_row_index(index + 2);
            }
            Some(record)
        })
        .collect();

    D::sort(&mut records);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datasets::{Announcements, Opportunities, Users};
    use crate::testing::MockRowStore;

    const TTL: Duration = Duration::from_secs(30);

    fn user_rows() -> Vec<Vec<String>> {
        vec![
            vec!["username".into(), "display_name".into(), "role".into()],
            vec!["alice".into(), "Alice".into(), "admin".into()],
            vec!["bob".into(), "Bob".into(), "sales".into()],
        ]
    }

    fn service(store: &Arc<MockRowStore>) -> CacheService<MockRowStore> {
        CacheService::new(Arc::clone(store), TTL)
    }

    #[tokio::test]
    async fn test_cache_hit_issues_no_second_call() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        let first = cache.fetch::<Users>().await;
        let second = cache.fetch::<Users>().await;

        assert_eq!(store.calls_for(Users::RANGE), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        let (a, b, c) = tokio::join!(
            cache.fetch::<Users>(),
            cache.fetch::<Users>(),
            cache.fetch::<Users>(),
        );

        assert_eq!(store.calls_for(Users::RANGE), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_single_key_forces_refetch() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        cache.fetch::<Users>().await;
        cache.invalidate(Some(DatasetKey::Users));
        cache.fetch::<Users>().await;

        assert_eq!(store.calls_for(Users::RANGE), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_hits_every_key() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        store.set_rows(Announcements::RANGE, vec![vec!["id".into()]]);
        let cache = service(&store);

        cache.fetch::<Users>().await;
        cache.fetch::<Announcements>().await;
        cache.invalidate(None);
        cache.fetch::<Users>().await;
        cache.fetch::<Announcements>().await;

        assert_eq!(store.calls_for(Users::RANGE), 2);
        assert_eq!(store.calls_for(Announcements::RANGE), 2);
    }

    #[tokio::test]
    async fn test_global_clock_is_monotone() {
        let store = Arc::new(MockRowStore::new());
        let cache = service(&store);

        let t0 = cache.last_write_timestamp();
        cache.invalidate(Some(DatasetKey::Users));
        let t1 = cache.last_write_timestamp();
        cache.invalidate(None);
        let t2 = cache.last_write_timestamp();

        // Every invalidation advances the clock, even within one millisecond
        assert!(t1 > t0);
        assert!(t2 > t1);
    }

    #[tokio::test]
    async fn test_row_indices_skip_header() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        let users = cache.fetch::<Users>().await;
        assert_eq!(users[0].row_index, Some(2));
        assert_eq!(users[1].row_index, Some(3));
    }

    #[tokio::test]
    async fn test_missing_range_yields_cached_empty_dataset() {
        let store = Arc::new(MockRowStore::new());
        store.set_missing(Users::RANGE);
        let cache = service(&store);

        let first = cache.fetch::<Users>().await;
        let second = cache.fetch::<Users>().await;

        assert!(first.is_empty());
        assert!(second.is_empty());
        // The empty result was cached with a fresh timestamp
        assert_eq!(store.calls_for(Users::RANGE), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_serves_last_known_data() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        let original = cache.fetch::<Users>().await;
        cache.invalidate(Some(DatasetKey::Users));
        store.set_failing(Users::RANGE);

        let fallback = cache.fetch::<Users>().await;
        assert_eq!(original, fallback);
        assert_eq!(store.calls_for(Users::RANGE), 2);

        // The failure neither clobbered the data nor refreshed the
        // timestamp, so recovery is picked up on the next read
        let mut refreshed = user_rows();
        refreshed.push(vec!["carol".into(), "Carol".into(), "sales".into()]);
        store.set_rows(Users::RANGE, refreshed);

        let recovered = cache.fetch::<Users>().await;
        assert_eq!(recovered.len(), 3);
        assert_eq!(store.calls_for(Users::RANGE), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_on_cold_cache_yields_empty_uncached() {
        let store = Arc::new(MockRowStore::new());
        store.set_failing(Users::RANGE);
        let cache = service(&store);

        let first = cache.fetch::<Users>().await;
        assert!(first.is_empty());

        // Nothing was cached, so the next read tries again
        store.set_rows(Users::RANGE, user_rows());
        let second = cache.fetch::<Users>().await;
        assert_eq!(second.len(), 2);
        assert_eq!(store.calls_for(Users::RANGE), 2);
    }

    #[tokio::test]
    async fn test_expired_ttl_triggers_refetch() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = CacheService::new(Arc::clone(&store), Duration::ZERO);

        cache.fetch::<Users>().await;
        cache.fetch::<Users>().await;

        assert_eq!(store.calls_for(Users::RANGE), 2);
    }

    #[tokio::test]
    async fn test_datasets_are_sorted_on_fetch() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(
            Opportunities::RANGE,
            vec![
                vec!["id".into(), "name".into()],
                vec![
                    "OPP-1".into(),
                    "old".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "2023-01-01 08:00:00".into(),
                ],
                vec![
                    "OPP-2".into(),
                    "new".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    "2024-06-01 08:00:00".into(),
                ],
            ],
        );
        let cache = service(&store);

        let opportunities = cache.fetch::<Opportunities>().await;
        assert_eq!(opportunities[0].opportunity_id, "OPP-2");
        // Row indices still reflect sheet position, not sort position
        assert_eq!(opportunities[0].row_index, Some(3));
    }

    #[tokio::test]
    async fn test_find_row_by_value_is_case_insensitive() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        let found = cache
            .find_row_by_value(Users::RANGE, 0, "ALICE")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.row_index, 2);
        assert_eq!(found.row_data[1], "Alice");
    }

    #[tokio::test]
    async fn test_find_row_by_value_misses() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        // No match
        assert!(cache
            .find_row_by_value(Users::RANGE, 0, "nobody")
            .await
            .unwrap()
            .is_none());
        // Column beyond the header width
        assert!(cache
            .find_row_by_value(Users::RANGE, 9, "alice")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_row_by_value_error_handling() {
        let store = Arc::new(MockRowStore::new());
        store.set_missing("Ghost!A:B");
        store.set_failing(Users::RANGE);
        let cache = service(&store);

        // Missing range is "not found", not an error
        assert!(cache
            .find_row_by_value("Ghost!A:B", 0, "x")
            .await
            .unwrap()
            .is_none());
        // Other failures are returned to the caller
        assert!(cache.find_row_by_value(Users::RANGE, 0, "alice").await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_bypasses_cache() {
        let store = Arc::new(MockRowStore::new());
        store.set_rows(Users::RANGE, user_rows());
        let cache = service(&store);

        cache.fetch::<Users>().await;
        cache.find_row_by_value(Users::RANGE, 0, "alice").await.unwrap();
        cache.find_row_by_value(Users::RANGE, 0, "bob").await.unwrap();

        // Every lookup went to the store despite the fresh cache
        assert_eq!(store.calls_for(Users::RANGE), 3);
    }
}
