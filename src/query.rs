//! Query bindings: the read path between a view and the query cache.
//!
//! A `QueryBinding<T>` ties a view's lifetime to one cache entry. Binding
//! subscribes (starting a fetch when the entry is idle or stale), `poll()`
//! picks up cache transitions in the event-loop tick, and dropping the
//! binding unsubscribes without aborting any in-flight fetch.
//!
//! # Example
//!
//! ```ignore
//! let api = client.clone();
//! let mut issues: QueryBinding<Vec<Issue>> = QueryBinding::new(
//!   store.clone(),
//!   QueryKey::issues(&sprint_id),
//!   fetcher(move || {
//!     let api = api.clone();
//!     let sprint_id = sprint_id.clone();
//!     async move { api.issues_for_sprint(&sprint_id).await }
//!   }),
//! );
//!
//! // In the event loop tick:
//! if issues.poll() {
//!   // state changed, re-render
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::ApiError;
use crate::store::{Fetcher, QueryKey, QueryStatus, QueryStore, Subscription};

/// Wrap a typed async closure into a cache [`Fetcher`].
///
/// The cache stores payloads as erased JSON; this adapter serializes the
/// closure's typed result on the way in.
pub fn fetcher<F, Fut, T>(f: F) -> Fetcher
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  T: Serialize,
{
  Arc::new(move || {
    let fut = f();
    Box::pin(async move {
      let value = fut.await?;
      serde_json::to_value(value).map_err(ApiError::from)
    })
  })
}

/// Reactive subscription linking a view to a cache entry.
pub struct QueryBinding<T> {
  store: QueryStore,
  key: QueryKey,
  fetcher: Fetcher,
  subscription: Option<Subscription>,
  status: QueryStatus,
  data: Option<T>,
  error: Option<String>,
}

impl<T: DeserializeOwned> QueryBinding<T> {
  /// Bind to the cache entry for `key`, fetching if needed.
  pub fn new(store: QueryStore, key: QueryKey, fetcher: Fetcher) -> Self {
    let mut binding = Self {
      store,
      key,
      fetcher,
      subscription: None,
      status: QueryStatus::Idle,
      data: None,
      error: None,
    };
    binding.bind();
    binding
  }

  /// Create the binding without subscribing; no fetch happens until
  /// [`set_enabled`](Self::set_enabled) turns it on.
  pub fn disabled(store: QueryStore, key: QueryKey, fetcher: Fetcher) -> Self {
    Self {
      store,
      key,
      fetcher,
      subscription: None,
      status: QueryStatus::Idle,
      data: None,
      error: None,
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.subscription.is_some()
  }

  /// Enable or disable the binding. Enabling subscribes (and fetches if the
  /// entry is idle or stale); disabling unsubscribes and clears local state.
  pub fn set_enabled(&mut self, enabled: bool) {
    match (enabled, self.subscription.is_some()) {
      (true, false) => self.bind(),
      (false, true) => {
        self.subscription = None;
        self.status = QueryStatus::Idle;
        self.data = None;
        self.error = None;
      }
      _ => {}
    }
  }

  /// Rebind to a different key (structural comparison; same key is a no-op).
  pub fn set_key(&mut self, key: QueryKey) {
    if key == self.key {
      return;
    }
    let was_enabled = self.subscription.is_some();
    self.subscription = None;
    self.key = key;
    self.data = None;
    self.error = None;
    self.status = QueryStatus::Idle;
    if was_enabled {
      self.bind();
    }
  }

  /// Poll for cache transitions; true if the local snapshot changed.
  pub fn poll(&mut self) -> bool {
    let changed = match &mut self.subscription {
      Some(sub) => sub.changed(),
      None => false,
    };
    if changed {
      self.refresh();
    }
    changed
  }

  /// Force a refetch of this binding's key.
  pub fn refetch(&self) {
    self.store.invalidate(&self.key);
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// True during the initial load, before any data has ever arrived.
  /// Refetches of an entry that already has data do not count (the stale
  /// payload keeps rendering); see [`is_fetching`](Self::is_fetching).
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading && self.data.is_none()
  }

  /// True whenever a fetch is in flight, including background refetches.
  pub fn is_fetching(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  fn bind(&mut self) {
    let subscription = self.store.subscribe(&self.key, Arc::clone(&self.fetcher));
    self.subscription = Some(subscription);
    self.refresh();
  }

  fn refresh(&mut self) {
    let snap = self.store.snapshot(&self.key);
    self.status = snap.status;
    self.error = snap.error;
    self.data = match snap.data {
      Some(value) => match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
          self.error = Some(format!("Unexpected response shape: {}", err));
          None
        }
      },
      None => None,
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn list_fetcher(counter: Arc<AtomicU32>, items: Vec<u32>) -> Fetcher {
    fetcher(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      let items = items.clone();
      async move { Ok::<_, ApiError>(items) }
    })
  }

  #[tokio::test]
  async fn test_binding_loads_typed_data() {
    let store = QueryStore::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut binding: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      QueryKey::issues("s1"),
      list_fetcher(counter.clone(), vec![1, 2, 3]),
    );

    assert!(binding.is_loading());
    assert!(binding.data().is_none());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(binding.poll());
    assert!(!binding.is_loading());
    assert_eq!(binding.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_empty_list_is_distinct_from_loading() {
    let store = QueryStore::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut binding: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      QueryKey::issues("sprintX"),
      list_fetcher(counter.clone(), vec![]),
    );

    // During the initial load there is no data at all.
    assert!(binding.is_loading());
    assert!(binding.data().is_none());

    tokio::time::sleep(Duration::from_millis(30)).await;
    binding.poll();

    // An empty result is real data, not a pending load.
    assert!(!binding.is_loading());
    assert_eq!(binding.data(), Some(&vec![]));
  }

  #[tokio::test]
  async fn test_disabled_binding_never_fetches() {
    let store = QueryStore::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut binding: QueryBinding<Vec<u32>> = QueryBinding::disabled(
      store.clone(),
      QueryKey::issues("s1"),
      list_fetcher(counter.clone(), vec![1]),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!binding.poll());
    assert!(!binding.is_loading());
    assert!(binding.data().is_none());
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // Enabling starts the fetch.
    binding.set_enabled(true);
    tokio::time::sleep(Duration::from_millis(30)).await;
    binding.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(binding.data(), Some(&vec![1]));
  }

  #[tokio::test]
  async fn test_error_surfaces_message() {
    let store = QueryStore::new();
    let mut binding: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      QueryKey::projects(),
      fetcher(|| async {
        Err::<Vec<u32>, _>(ApiError::Api {
          status: 500,
          message: "Server exploded".to_string(),
        })
      }),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(binding.poll());
    assert_eq!(binding.error(), Some("Server exploded"));
    assert!(binding.data().is_none());
  }

  #[tokio::test]
  async fn test_key_change_rebinds() {
    let store = QueryStore::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut binding: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      QueryKey::issues("s1"),
      list_fetcher(counter.clone(), vec![1]),
    );
    tokio::time::sleep(Duration::from_millis(30)).await;
    binding.poll();
    assert_eq!(binding.data(), Some(&vec![1]));

    binding.set_key(QueryKey::issues("s2"));
    assert!(binding.data().is_none());
    tokio::time::sleep(Duration::from_millis(30)).await;
    binding.poll();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(binding.data(), Some(&vec![1]));

    // Setting the same key again is a no-op.
    binding.set_key(QueryKey::issues("s2"));
    assert_eq!(binding.data(), Some(&vec![1]));
  }

  #[tokio::test]
  async fn test_dropped_binding_stops_refetching() {
    let store = QueryStore::new();
    let key = QueryKey::projects();
    let counter = Arc::new(AtomicU32::new(0));

    {
      let _binding: QueryBinding<Vec<u32>> = QueryBinding::new(
        store.clone(),
        key.clone(),
        list_fetcher(counter.clone(), vec![]),
      );
      tokio::time::sleep(Duration::from_millis(30)).await;
    }

    // With no live subscribers, invalidation clears instead of refetching.
    store.invalidate(&key);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_two_bindings_share_updates() {
    let store = QueryStore::new();
    let key = QueryKey::issues("s1");
    let counter = Arc::new(AtomicU32::new(0));

    let mut a: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      key.clone(),
      list_fetcher(counter.clone(), vec![7]),
    );
    let mut b: QueryBinding<Vec<u32>> = QueryBinding::new(
      store.clone(),
      key.clone(),
      list_fetcher(counter.clone(), vec![7]),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    a.poll();
    b.poll();

    // One shared fetch; both bindings see the result.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.data(), Some(&vec![7]));
    assert_eq!(b.data(), Some(&vec![7]));
  }
}
