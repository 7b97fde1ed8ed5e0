//! Durable session storage and the startup auth guard.
//!
//! The session (`{token, user}`) persists across runs in a JSON file under
//! the user data directory. It is written when an auth check succeeds and
//! destroyed on logout or when the server rejects the token.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::api::types::UserProfile;
use crate::api::ApiClient;

/// Persisted session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub token: String,
  pub user: UserProfile,
  pub saved_at: DateTime<Utc>,
}

/// File-backed session storage.
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Ok(Self {
      path: Self::default_path()?,
    })
  }

  /// Open the store at an explicit path.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Get the default session file path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("trak").join("session.json"))
  }

  /// Load the stored session, if any. A corrupt file is treated as absent.
  pub fn load(&self) -> Result<Option<Session>> {
    if !self.path.exists() {
      return Ok(None);
    }

    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| eyre!("Failed to read session file {}: {}", self.path.display(), e))?;

    match serde_json::from_str(&contents) {
      Ok(session) => Ok(Some(session)),
      Err(e) => {
        warn!("Discarding corrupt session file: {}", e);
        Ok(None)
      }
    }
  }

  /// Persist a session, creating the parent directory if needed.
  pub fn save(&self, session: &Session) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))?;

    Ok(())
  }

  /// Remove the stored session.
  pub fn clear(&self) -> Result<()> {
    if self.path.exists() {
      std::fs::remove_file(&self.path)
        .map_err(|e| eyre!("Failed to remove session file {}: {}", self.path.display(), e))?;
    }
    Ok(())
  }
}

/// Outcome of the startup auth check.
#[derive(Debug, Clone)]
pub enum AuthState {
  /// Token accepted; the current user profile is attached.
  Authenticated(UserProfile),
  /// No token, or the server rejected it. Stored session has been cleared.
  Unauthenticated,
}

/// Verify the client's token against `/auth/me`.
///
/// A valid token refreshes the stored session with the server's profile. A
/// rejected token or a network failure clears both the stored session and
/// the client's token, so every later request goes out unauthenticated.
pub async fn check_auth(client: &ApiClient, sessions: &SessionStore) -> AuthState {
  let token = match client.token() {
    Some(token) => token,
    None => return AuthState::Unauthenticated,
  };

  match client.me().await {
    Ok(user) => {
      let session = Session {
        token,
        user: user.clone(),
        saved_at: Utc::now(),
      };
      if let Err(e) = sessions.save(&session) {
        warn!("Failed to persist session: {}", e);
      }
      AuthState::Authenticated(user)
    }
    Err(err) => {
      if err.is_auth_error() {
        warn!("Stored token rejected by the server");
      } else {
        warn!("Auth check failed: {}", err);
      }
      let _ = sessions.clear();
      client.clear_token();
      AuthState::Unauthenticated
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Role;
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn profile() -> UserProfile {
    UserProfile {
      full_name: "Ada Lovelace".to_string(),
      email: "ada@example.com".to_string(),
      role: Role::Manager,
    }
  }

  #[test]
  fn test_save_load_clear_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::at(dir.path().join("session.json"));

    assert!(store.load().unwrap().is_none());

    let session = Session {
      token: "secret".to_string(),
      user: profile(),
      saved_at: Utc::now(),
    };
    store.save(&session).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.token, "secret");
    assert_eq!(loaded.user.email, "ada@example.com");

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
  }

  #[test]
  fn test_corrupt_session_file_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();

    let store = SessionStore::at(path);
    assert!(store.load().unwrap().is_none());
  }

  #[tokio::test]
  async fn test_valid_token_authenticates_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/auth/me"))
      .and(header("authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "role": "manager"
      })))
      .mount(&server)
      .await;

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::at(dir.path().join("session.json"));
    let client = ApiClient::new(&server.uri(), Some("secret".to_string())).unwrap();

    match check_auth(&client, &store).await {
      AuthState::Authenticated(user) => assert_eq!(user.role, Role::Manager),
      other => panic!("expected Authenticated, got {:?}", other),
    }

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.token, "secret");
  }

  #[tokio::test]
  async fn test_rejected_token_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/auth/me"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({
        "message": "Unauthorized"
      })))
      .mount(&server)
      .await;

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::at(dir.path().join("session.json"));
    store
      .save(&Session {
        token: "stale".to_string(),
        user: profile(),
        saved_at: Utc::now(),
      })
      .unwrap();

    let client = ApiClient::new(&server.uri(), Some("stale".to_string())).unwrap();

    match check_auth(&client, &store).await {
      AuthState::Unauthenticated => {}
      other => panic!("expected Unauthenticated, got {:?}", other),
    }

    assert!(store.load().unwrap().is_none());
    assert!(!client.has_token());
  }

  #[tokio::test]
  async fn test_missing_token_short_circuits() {
    // No mock server: without a token the guard must not touch the network.
    let store = SessionStore::at("/nonexistent/session.json");
    let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();

    match check_auth(&client, &store).await {
      AuthState::Unauthenticated => {}
      other => panic!("expected Unauthenticated, got {:?}", other),
    }
  }
}
