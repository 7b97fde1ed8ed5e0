//! Typed errors for the Trak API client.

use thiserror::Error;

/// Error type for API client operations.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Transport failure - no response from the server.
  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  /// Server responded with a non-2xx status.
  #[error("API error ({status}): {message}")]
  Api {
    /// HTTP status code.
    status: u16,
    /// Message parsed from the response body (or a generic fallback).
    message: String,
  },

  /// Application-level lookup that exhausted its search.
  #[error("Not found: {0}")]
  NotFound(String),

  /// URL parsing failed.
  #[error("Invalid URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  /// JSON (de)serialization failed.
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

impl ApiError {
  /// Human-readable message suitable for inline display next to a form.
  pub fn message(&self) -> String {
    match self {
      ApiError::Network(_) => "Network error. Please try again.".to_string(),
      ApiError::Api { message, .. } => message.clone(),
      ApiError::NotFound(msg) => msg.clone(),
      other => other.to_string(),
    }
  }

  /// Check if this is an authentication failure.
  pub fn is_auth_error(&self) -> bool {
    matches!(self, ApiError::Api { status: 401, .. })
  }

  /// Check if this is a not-found error.
  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound(_)) || matches!(self, ApiError::Api { status: 404, .. })
  }
}

/// Result type for API client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body the server sends for failed requests.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
  pub message: String,
}
