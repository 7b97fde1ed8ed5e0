//! Trak API client wrapper.
//!
//! Issues authenticated requests against the tracker's REST API. The bearer
//! token lives in a shared slot so logout can clear it atomically; requests
//! already in flight keep the token they were built with.

use std::sync::{Arc, RwLock};

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::error::{ApiError, ErrorResponse, Result};
use super::types::{
  AssignableUser, Issue, IssuePayload, ProfileUpdate, Project, ProjectPayload, SprintPayload,
  SubIssue, SubIssuePayload, UserProfile,
};
use crate::api::types::Sprint;

/// Fallback when an error response has no parsable `message` field.
const GENERIC_ERROR: &str = "Request failed";

/// Trak API client.
///
/// Cheap to clone; all clones share the same HTTP connection pool and token.
#[derive(Clone)]
pub struct ApiClient {
  inner: Arc<ClientInner>,
}

struct ClientInner {
  http: reqwest::Client,
  base_url: Url,
  token: RwLock<Option<String>>,
}

impl ApiClient {
  /// Create a new client for the given base URL.
  pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
    let mut base_url = Url::parse(base_url)?;
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(concat!("trak/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      inner: Arc::new(ClientInner {
        http,
        base_url,
        token: RwLock::new(token),
      }),
    })
  }

  /// Clear the bearer token. Subsequent requests omit the Authorization header.
  pub fn clear_token(&self) {
    if let Ok(mut slot) = self.inner.token.write() {
      *slot = None;
    }
  }

  /// Current bearer token, if any.
  pub fn token(&self) -> Option<String> {
    self.inner.token.read().ok().and_then(|t| t.clone())
  }

  pub fn has_token(&self) -> bool {
    self
      .inner
      .token
      .read()
      .map(|t| t.is_some())
      .unwrap_or(false)
  }

  fn url(&self, path: &str) -> Result<Url> {
    let path = path.trim_start_matches('/');
    self.inner.base_url.join(path).map_err(ApiError::from)
  }

  /// Attach the bearer token to a request if one is present.
  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match self.inner.token.read().ok().and_then(|t| t.clone()) {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = self.url(path)?;
    let response = self.authorize(self.inner.http.get(url)).send().await?;
    Self::handle_response(response).await
  }

  async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let url = self.url(path)?;
    let response = self
      .authorize(self.inner.http.post(url))
      .json(body)
      .send()
      .await?;
    Self::handle_response(response).await
  }

  async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let url = self.url(path)?;
    let response = self
      .authorize(self.inner.http.put(url))
      .json(body)
      .send()
      .await?;
    Self::handle_response(response).await
  }

  async fn delete(&self, path: &str) -> Result<Value> {
    let url = self.url(path)?;
    let response = self.authorize(self.inner.http.delete(url)).send().await?;
    Self::handle_response(response).await
  }

  /// Extract the body on 2xx, or a typed error otherwise.
  async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if response.status().is_success() {
      Ok(response.json().await?)
    } else {
      Err(Self::extract_error(response).await)
    }
  }

  async fn extract_error(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorResponse>().await {
      Ok(err) => err.message,
      Err(_) => GENERIC_ERROR.to_string(),
    };
    ApiError::Api { status, message }
  }

  // ==========================================================================
  // Projects
  // ==========================================================================

  pub async fn list_projects(&self) -> Result<Vec<Project>> {
    self.get("api/project").await
  }

  pub async fn get_project(&self, project_id: &str) -> Result<Project> {
    self.get(&format!("api/project/{}", project_id)).await
  }

  pub async fn create_project(&self, payload: &ProjectPayload) -> Result<Project> {
    self.post("api/project", payload).await
  }

  pub async fn update_project(&self, project_id: &str, payload: &ProjectPayload) -> Result<Project> {
    self.put(&format!("api/project/{}", project_id), payload).await
  }

  // ==========================================================================
  // Sprints
  // ==========================================================================

  pub async fn list_sprints(&self) -> Result<Vec<Sprint>> {
    self.get("api/sprint").await
  }

  pub async fn sprints_for_project(&self, project_id: &str) -> Result<Vec<Sprint>> {
    self.get(&format!("api/sprint/project/{}", project_id)).await
  }

  pub async fn get_sprint(&self, sprint_id: &str) -> Result<Sprint> {
    self.get(&format!("api/sprint/{}", sprint_id)).await
  }

  pub async fn create_sprint(&self, payload: &SprintPayload) -> Result<Sprint> {
    self.post("api/sprint", payload).await
  }

  pub async fn update_sprint(&self, sprint_id: &str, payload: &SprintPayload) -> Result<Sprint> {
    self.put(&format!("api/sprint/{}", sprint_id), payload).await
  }

  // ==========================================================================
  // Issues
  // ==========================================================================

  pub async fn issues_for_sprint(&self, sprint_id: &str) -> Result<Vec<Issue>> {
    self.get(&format!("api/issue/{}", sprint_id)).await
  }

  pub async fn create_issue(&self, sprint_id: &str, payload: &IssuePayload) -> Result<Issue> {
    self.post(&format!("api/issue/{}", sprint_id), payload).await
  }

  pub async fn update_issue(&self, issue_id: &str, payload: &IssuePayload) -> Result<Issue> {
    self.put(&format!("api/issue/{}", issue_id), payload).await
  }

  pub async fn delete_issue(&self, issue_id: &str) -> Result<Value> {
    self.delete(&format!("api/issue/{}", issue_id)).await
  }

  /// Find an issue by id by scanning every sprint's issue list.
  ///
  /// The server exposes no direct issue lookup, so this walks `GET
  /// /api/sprint` and then each sprint's issues until the id matches.
  /// Sprints whose issue list fails to load are skipped and the search
  /// continues. Exhausting the search yields `ApiError::NotFound`.
  pub async fn find_issue(&self, issue_id: &str) -> Result<Issue> {
    let sprints = self.list_sprints().await?;

    for sprint in sprints {
      match self.issues_for_sprint(&sprint.id).await {
        Ok(issues) => {
          if let Some(issue) = issues.into_iter().find(|i| i.id == issue_id) {
            return Ok(issue);
          }
        }
        Err(_) => continue,
      }
    }

    Err(ApiError::NotFound(format!("Issue {} not found", issue_id)))
  }

  // ==========================================================================
  // Sub-issues
  // ==========================================================================

  pub async fn subissues_for_issue(&self, issue_id: &str) -> Result<Vec<SubIssue>> {
    self.get(&format!("api/subissue/issue/{}", issue_id)).await
  }

  pub async fn create_subissue(&self, issue_id: &str, payload: &SubIssuePayload) -> Result<SubIssue> {
    self.post(&format!("api/subissue/issue/{}", issue_id), payload).await
  }

  pub async fn update_subissue(&self, subissue_id: &str, payload: &SubIssuePayload) -> Result<SubIssue> {
    self.put(&format!("api/subissue/{}", subissue_id), payload).await
  }

  pub async fn delete_subissue(&self, subissue_id: &str) -> Result<Value> {
    self.delete(&format!("api/subissue/{}", subissue_id)).await
  }

  // ==========================================================================
  // Auth
  // ==========================================================================

  pub async fn me(&self) -> Result<UserProfile> {
    self.get("auth/me").await
  }

  pub async fn update_me(&self, payload: &ProfileUpdate) -> Result<UserProfile> {
    self.put("auth/me", payload).await
  }

  pub async fn list_users(&self) -> Result<Vec<AssignableUser>> {
    self.get("auth/users").await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{header, header_exists, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn sprint_json(id: &str, name: &str) -> Value {
    json!({
      "_id": id,
      "sprintName": name,
      "sprintType": "scrum",
      "projectId": "p1"
    })
  }

  fn issue_json(id: &str, sprint_id: &str) -> Value {
    json!({
      "_id": id,
      "customId": "ALPHA-1",
      "title": "Title",
      "Summary": "Summary",
      "status": "Open",
      "issueType": "Task",
      "priority": "Medium",
      "assignedTo": "dev@example.com",
      "sprintId": sprint_id,
      "projectId": "p1"
    })
  }

  #[tokio::test]
  async fn test_bearer_token_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/project"))
      .and(header("authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), Some("secret".to_string())).unwrap();
    let projects = client.list_projects().await.unwrap();
    assert!(projects.is_empty());
  }

  #[tokio::test]
  async fn test_cleared_token_omits_header() {
    let server = MockServer::start().await;

    // A request that still carries an Authorization header is a failure here.
    Mock::given(method("GET"))
      .and(path("/api/project"))
      .and(header_exists("authorization"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({
        "message": "token should have been cleared"
      })))
      .with_priority(1)
      .mount(&server)
      .await;

    Mock::given(method("GET"))
      .and(path("/api/project"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .with_priority(2)
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), Some("secret".to_string())).unwrap();
    client.clear_token();
    assert!(!client.has_token());

    let projects = client.list_projects().await.unwrap();
    assert!(projects.is_empty());
  }

  #[tokio::test]
  async fn test_error_message_parsed_from_body() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
      .and(path("/api/subissue/s1"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({
        "message": "Validation failed"
      })))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();
    let payload = SubIssuePayload {
      title: "t".to_string(),
      summary: "s".to_string(),
      subissue_type: crate::api::types::SubIssueType::SubTask,
      status: crate::api::types::Status::Open,
      priority: crate::api::types::Priority::Low,
      assigned_to: "a".to_string(),
    };

    let err = client.update_subissue("s1", &payload).await.unwrap_err();
    match err {
      ApiError::Api { status, message } => {
        assert_eq!(status, 400);
        assert_eq!(message, "Validation failed");
      }
      other => panic!("expected Api error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_unparsable_error_body_gets_generic_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/project"))
      .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();
    let err = client.list_projects().await.unwrap_err();
    match err {
      ApiError::Api { status, message } => {
        assert_eq!(status, 502);
        assert_eq!(message, GENERIC_ERROR);
      }
      other => panic!("expected Api error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_find_issue_scans_sprints() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/sprint"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        sprint_json("s1", "Sprint 1"),
        sprint_json("s2", "Sprint 2"),
      ])))
      .mount(&server)
      .await;

    // First sprint's issues fail to load; the search must continue.
    Mock::given(method("GET"))
      .and(path("/api/issue/s1"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
      .mount(&server)
      .await;

    Mock::given(method("GET"))
      .and(path("/api/issue/s2"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!([issue_json("other", "s2"), issue_json("target", "s2")])),
      )
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();
    let issue = client.find_issue("target").await.unwrap();
    assert_eq!(issue.id, "target");
    assert_eq!(issue.sprint_id, "s2");
  }

  #[tokio::test]
  async fn test_find_issue_exhausted_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/sprint"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([sprint_json("s1", "Sprint")])))
      .mount(&server)
      .await;

    Mock::given(method("GET"))
      .and(path("/api/issue/s1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();
    let err = client.find_issue("missing").await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_single_resource_lookups() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/project/p1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "_id": "p1",
        "name": "Alpha",
        "key": "ALPHA",
        "type": "scrum"
      })))
      .mount(&server)
      .await;

    Mock::given(method("GET"))
      .and(path("/api/sprint/s1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(sprint_json("s1", "Sprint 1")))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();

    let project = client.get_project("p1").await.unwrap();
    assert_eq!(project.key, "ALPHA");
    assert!(project.issues.is_empty());

    let sprint = client.get_sprint("s1").await.unwrap();
    assert_eq!(sprint.sprint_name, "Sprint 1");
  }

  #[tokio::test]
  async fn test_empty_issue_list_deserializes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/api/issue/s1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), None).unwrap();
    let issues = client.issues_for_sprint("s1").await.unwrap();
    assert!(issues.is_empty());
  }
}
