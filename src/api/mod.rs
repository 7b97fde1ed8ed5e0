//! Trak REST API client: typed endpoints, wire types, and error taxonomy.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, Result};
