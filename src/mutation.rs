//! Mutation bindings: the write path.
//!
//! A `Mutation<I, T>` wraps one create/update/delete operation with its own
//! pending/error tracking, separate from the query cache. Calling `mutate`
//! while a call is pending is ignored, so a double-press cannot issue a
//! duplicate write. On success the `on_success` hook runs (typically
//! invalidating one or more cache keys) and the mutation resets to idle; on
//! failure the error sticks until the next `mutate`.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::api::ApiError;

/// State of a mutation binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
  Idle,
  Pending,
  Error,
}

type MutationFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;
type Runner<I, T> = Box<dyn Fn(I) -> MutationFuture<T> + Send>;
type SuccessHook<T> = Box<dyn FnMut(&T) + Send>;
type ErrorHook = Box<dyn FnMut(&ApiError) + Send>;

/// One-shot write operation with pending/error tracking.
pub struct Mutation<I, T> {
  runner: Runner<I, T>,
  status: MutationStatus,
  error: Option<String>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
  on_success: Option<SuccessHook<T>>,
  on_error: Option<ErrorHook>,
}

impl<I, T: Send + 'static> Mutation<I, T> {
  pub fn new<F, Fut>(f: F) -> Self
  where
    F: Fn(I) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      runner: Box::new(move |input| Box::pin(f(input))),
      status: MutationStatus::Idle,
      error: None,
      receiver: None,
      on_success: None,
      on_error: None,
    }
  }

  /// Hook invoked with the result of a successful mutation, before the
  /// status resets to idle. This is where cache invalidation belongs.
  pub fn on_success(mut self, hook: impl FnMut(&T) + Send + 'static) -> Self {
    self.on_success = Some(Box::new(hook));
    self
  }

  /// Hook invoked with the error of a failed mutation.
  pub fn on_error(mut self, hook: impl FnMut(&ApiError) + Send + 'static) -> Self {
    self.on_error = Some(Box::new(hook));
    self
  }

  /// Start the mutation. A call while one is already pending is a no-op.
  pub fn mutate(&mut self, input: I) {
    if self.status == MutationStatus::Pending {
      return;
    }

    self.status = MutationStatus::Pending;
    self.error = None;

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.runner)(input);
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send(result);
    });
  }

  /// Poll for completion. Returns true when the mutation settled this tick;
  /// check [`error`](Self::error) to distinguish success from failure.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(result)) => {
        if let Some(hook) = &mut self.on_success {
          hook(&result);
        }
        self.status = MutationStatus::Idle;
        self.error = None;
        self.receiver = None;
        true
      }
      Ok(Err(err)) => {
        self.status = MutationStatus::Error;
        self.error = Some(err.message());
        if let Some(hook) = &mut self.on_error {
          hook(&err);
        }
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.status = MutationStatus::Error;
        self.error = Some("Mutation was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  pub fn status(&self) -> MutationStatus {
    self.status
  }

  pub fn is_pending(&self) -> bool {
    self.status == MutationStatus::Pending
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{fetcher, QueryBinding};
  use crate::store::{QueryKey, QueryStore};
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_success_runs_hook_and_resets_to_idle() {
    let hits = Arc::new(AtomicU32::new(0));
    let hook_hits = hits.clone();

    let mut mutation: Mutation<u32, u32> = Mutation::new(|input: u32| async move { Ok(input * 2) })
      .on_success(move |result| {
        assert_eq!(*result, 42);
        hook_hits.fetch_add(1, Ordering::SeqCst);
      });

    mutation.mutate(21);
    assert!(mutation.is_pending());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(mutation.poll());
    assert_eq!(mutation.status(), MutationStatus::Idle);
    assert!(mutation.error().is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_mutate_while_pending_is_ignored() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut mutation: Mutation<(), u32> = Mutation::new(move |_| {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(1)
      }
    });

    mutation.mutate(());
    mutation.mutate(()); // double-click: must not start a second write
    tokio::time::sleep(Duration::from_millis(100)).await;
    mutation.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_error_sticks_until_next_mutate() {
    let mut mutation: Mutation<bool, u32> = Mutation::new(|should_fail: bool| async move {
      if should_fail {
        Err(ApiError::Api {
          status: 400,
          message: "Validation failed".to_string(),
        })
      } else {
        Ok(1)
      }
    });

    mutation.mutate(true);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(mutation.poll());
    assert_eq!(mutation.status(), MutationStatus::Error);
    assert_eq!(mutation.error(), Some("Validation failed"));

    // The error holds until a new attempt starts, then clears.
    mutation.mutate(false);
    assert!(mutation.error().is_none());
    tokio::time::sleep(Duration::from_millis(30)).await;
    mutation.poll();
    assert_eq!(mutation.status(), MutationStatus::Idle);
  }

  #[tokio::test]
  async fn test_on_error_hook_receives_typed_error() {
    let statuses = Arc::new(AtomicU32::new(0));
    let seen = statuses.clone();

    let mut mutation: Mutation<(), u32> = Mutation::new(|_| async {
      Err(ApiError::Api {
        status: 409,
        message: "Conflict".to_string(),
      })
    })
    .on_error(move |err| {
      if let ApiError::Api { status, .. } = err {
        seen.store(u32::from(*status), Ordering::SeqCst);
      }
    });

    mutation.mutate(());
    tokio::time::sleep(Duration::from_millis(30)).await;
    mutation.poll();

    assert_eq!(statuses.load(Ordering::SeqCst), 409);
  }

  #[tokio::test]
  async fn test_success_invalidation_refetches_subscribed_query() {
    let store = QueryStore::new();
    let key = QueryKey::projects();
    let fetches = Arc::new(AtomicU32::new(0));

    let fetch_counter = fetches.clone();
    let mut projects: QueryBinding<Vec<String>> = QueryBinding::new(
      store.clone(),
      key.clone(),
      fetcher(move || {
        let n = fetch_counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
          let mut names = vec!["Legacy".to_string()];
          if n > 1 {
            names.push("Alpha".to_string());
          }
          Ok::<_, ApiError>(names)
        }
      }),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    projects.poll();
    assert_eq!(projects.data(), Some(&vec!["Legacy".to_string()]));

    // Create a project; on success the projects key is invalidated and the
    // subscribed binding picks up the new list without a manual refresh.
    let invalidate_store = store.clone();
    let invalidate_key = key.clone();
    let mut create: Mutation<(), serde_json::Value> =
      Mutation::new(|_| async { Ok(json!({ "name": "Alpha", "key": "ALPHA" })) }).on_success(
        move |_| {
          invalidate_store.invalidate(&invalidate_key);
        },
      );

    create.mutate(());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(create.poll());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(projects.poll());

    assert_eq!(
      projects.data(),
      Some(&vec!["Legacy".to_string(), "Alpha".to_string()])
    );
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
  }
}
