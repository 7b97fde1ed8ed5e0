//! Process-wide query cache.
//!
//! Every remote read in the app goes through this store. Entries are keyed
//! by structural [`QueryKey`]s and move through a small state machine:
//!
//! ```text
//! idle --(bind)--> loading --(fetch ok)--> success
//!                  loading --(fetch err)--> error
//! success/error --(invalidate | stale rebind)--> loading
//! ```
//!
//! Previous data is retained while a refetch is in flight so views keep
//! rendering the last good payload. Each in-flight fetch carries the entry's
//! generation at spawn time; results from superseded generations are
//! discarded, so back-to-back invalidations settle on the newest fetch even
//! when an older one resolves last.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::key::QueryKey;
use crate::api::ApiError;

/// Default duration after which a successful entry is refetched on rebind.
const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// A boxed future producing a fetched payload.
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>;

/// A factory producing fetch futures; stored per entry so invalidation can
/// refetch without the binding's involvement.
pub type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Fetch status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  Idle,
  Loading,
  Success,
  Error,
}

/// Point-in-time view of a cache entry, handed to bindings.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
  pub status: QueryStatus,
  /// Last successful payload; survives refetches and errors.
  pub data: Option<Value>,
  /// Last failure; cleared when a new fetch starts.
  pub error: Option<String>,
}

impl QuerySnapshot {
  fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
    }
  }
}

struct QueryEntry {
  status: QueryStatus,
  data: Option<Value>,
  error: Option<String>,
  /// Monotonic per-key counter; bumped whenever a fetch starts, so a
  /// completing fetch can tell whether it has been superseded.
  generation: u64,
  fetcher: Option<Fetcher>,
  subscribers: HashMap<u64, mpsc::UnboundedSender<()>>,
  fetched_at: Option<Instant>,
}

impl QueryEntry {
  fn new() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      generation: 0,
      fetcher: None,
      subscribers: HashMap::new(),
      fetched_at: None,
    }
  }

  fn notify(&self) {
    for tx in self.subscribers.values() {
      // A closed receiver just means the binding is being dropped.
      let _ = tx.send(());
    }
  }

  fn is_stale(&self, stale_time: Duration) -> bool {
    self
      .fetched_at
      .map(|t| t.elapsed() > stale_time)
      .unwrap_or(true)
  }
}

/// Shared in-memory query cache. Cheap to clone.
pub struct QueryStore {
  shared: Arc<Shared>,
}

struct Shared {
  entries: Mutex<HashMap<QueryKey, QueryEntry>>,
  next_subscriber_id: AtomicU64,
  stale_time: Duration,
}

impl Clone for QueryStore {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl Default for QueryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryStore {
  pub fn new() -> Self {
    Self::with_stale_time(DEFAULT_STALE_TIME)
  }

  /// Create a store with a custom stale time for rebind refetching.
  pub fn with_stale_time(stale_time: Duration) -> Self {
    Self {
      shared: Arc::new(Shared {
        entries: Mutex::new(HashMap::new()),
        next_subscriber_id: AtomicU64::new(1),
        stale_time,
      }),
    }
  }

  /// Subscribe to a key, creating its entry if needed.
  ///
  /// Stores the fetcher on the entry and starts a fetch when the entry is
  /// idle or its data has gone stale. If a fetch is already in flight the
  /// new subscriber shares it - exactly one network call per key at a time.
  pub fn subscribe(&self, key: &QueryKey, fetcher: Fetcher) -> Subscription {
    let id = self.shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::unbounded_channel();

    {
      let mut entries = self.lock_entries();
      let entry = entries.entry(key.clone()).or_insert_with(QueryEntry::new);
      entry.fetcher = Some(fetcher);
      entry.subscribers.insert(id, tx);

      let should_fetch = match entry.status {
        QueryStatus::Idle => true,
        // De-duplication: await the in-flight fetch instead of starting one.
        QueryStatus::Loading => false,
        QueryStatus::Success | QueryStatus::Error => entry.is_stale(self.shared.stale_time),
      };

      if should_fetch {
        self.start_fetch(key, entry);
      }
    }

    Subscription {
      store: self.clone(),
      key: key.clone(),
      id,
      rx,
    }
  }

  /// Current state of a key; `Idle` with no data when the key is unknown.
  pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
    let entries = self.lock_entries();
    match entries.get(key) {
      Some(entry) => QuerySnapshot {
        status: entry.status,
        data: entry.data.clone(),
        error: entry.error.clone(),
      },
      None => QuerySnapshot::idle(),
    }
  }

  /// Invalidate a single key.
  pub fn invalidate(&self, key: &QueryKey) {
    self.invalidate_where(|k| k == key);
  }

  /// Invalidate every key starting with the given prefix.
  pub fn invalidate_prefix(&self, prefix: &QueryKey) {
    self.invalidate_where(|k| k.starts_with(prefix));
  }

  /// Invalidate every key matching the predicate.
  ///
  /// Entries with active subscribers refetch immediately (retaining their
  /// data for display). Entries with no subscribers are cleared back to
  /// idle, so the next subscription triggers the refetch - no network call
  /// happens for data nobody is watching.
  pub fn invalidate_where(&self, pred: impl Fn(&QueryKey) -> bool) {
    let mut entries = self.lock_entries();
    for (key, entry) in entries.iter_mut() {
      if !pred(key) {
        continue;
      }

      if !entry.subscribers.is_empty() && entry.fetcher.is_some() {
        self.start_fetch(key, entry);
      } else {
        debug!(%key, "clearing unwatched entry");
        // Orphan any in-flight fetch for this entry as well.
        entry.generation += 1;
        entry.status = QueryStatus::Idle;
        entry.data = None;
        entry.error = None;
        entry.fetched_at = None;
      }
    }
  }

  /// Drop every entry without active subscribers (logout teardown).
  pub fn evict_unused(&self) {
    let mut entries = self.lock_entries();
    entries.retain(|_, entry| !entry.subscribers.is_empty());
  }

  #[cfg(test)]
  fn subscriber_count(&self, key: &QueryKey) -> usize {
    self
      .lock_entries()
      .get(key)
      .map(|e| e.subscribers.len())
      .unwrap_or(0)
  }

  /// Start a fetch for an entry, bumping its generation.
  ///
  /// Caller holds the entries lock; this only spawns, it never re-locks.
  fn start_fetch(&self, key: &QueryKey, entry: &mut QueryEntry) {
    let fetcher = match &entry.fetcher {
      Some(f) => Arc::clone(f),
      None => return,
    };

    entry.generation += 1;
    let generation = entry.generation;
    entry.status = QueryStatus::Loading;
    entry.error = None;
    entry.notify();

    debug!(%key, generation, "starting fetch");

    let store = self.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = fetcher().await;
      store.complete_fetch(&key, generation, result);
    });
  }

  /// Record a fetch result, unless the entry has moved on to a newer
  /// generation - stale results are discarded, never written.
  fn complete_fetch(&self, key: &QueryKey, generation: u64, result: Result<Value, ApiError>) {
    let mut entries = self.lock_entries();
    let entry = match entries.get_mut(key) {
      Some(entry) => entry,
      None => return,
    };

    if entry.generation != generation {
      debug!(%key, generation, current = entry.generation, "discarding stale fetch result");
      return;
    }

    match result {
      Ok(data) => {
        entry.status = QueryStatus::Success;
        entry.data = Some(data);
        entry.error = None;
      }
      Err(err) => {
        entry.status = QueryStatus::Error;
        entry.error = Some(err.message());
      }
    }
    entry.fetched_at = Some(Instant::now());
    entry.notify();
  }

  fn unsubscribe(&self, key: &QueryKey, id: u64) {
    let mut entries = self.lock_entries();
    if let Some(entry) = entries.get_mut(key) {
      entry.subscribers.remove(&id);
      // The entry itself is retained (deferred eviction): a remount reuses
      // cached data, and a still-running fetch can land its result.
    }
  }

  fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, QueryEntry>> {
    // All cache access is short and non-reentrant; poisoning only happens
    // if a holder panicked, in which case the map is still consistent.
    match self.shared.entries.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }
}

/// Handle registering one subscriber on one cache entry.
///
/// Dropping the subscription unregisters it; the entry stays cached.
pub struct Subscription {
  store: QueryStore,
  key: QueryKey,
  id: u64,
  rx: mpsc::UnboundedReceiver<()>,
}

impl Subscription {
  /// Drain pending change notifications; true if any state transition
  /// happened since the last call.
  pub fn changed(&mut self) -> bool {
    let mut changed = false;
    while self.rx.try_recv().is_ok() {
      changed = true;
    }
    changed
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.store.unsubscribe(&self.key, self.id);
  }
}
