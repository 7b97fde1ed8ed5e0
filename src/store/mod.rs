//! Client-side query cache: structural keys, entry state machine,
//! subscriptions, and invalidation.

mod cache;
mod key;

pub use cache::{FetchFuture, Fetcher, QuerySnapshot, QueryStatus, QueryStore, Subscription};
pub use key::QueryKey;
