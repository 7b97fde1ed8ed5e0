//! Wire types for the Trak REST API.
//!
//! Field names follow the server contract exactly (camelCase, mongo-style
//! `_id` identifiers, and the legacy capitalized `Summary` on issues), so
//! every struct here derives its serde renames explicitly.

use serde::{Deserialize, Serialize};

/// Workflow status shared by issues and sub-issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
  Open,
  #[serde(rename = "In Progress")]
  InProgress,
  Closed,
}

impl Status {
  pub fn label(&self) -> &'static str {
    match self {
      Status::Open => "Open",
      Status::InProgress => "In Progress",
      Status::Closed => "Closed",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    match label {
      "Open" => Some(Status::Open),
      "In Progress" => Some(Status::InProgress),
      "Closed" => Some(Status::Closed),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
  Task,
  Bug,
}

impl IssueType {
  pub fn label(&self) -> &'static str {
    match self {
      IssueType::Task => "Task",
      IssueType::Bug => "Bug",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    match label {
      "Task" => Some(IssueType::Task),
      "Bug" => Some(IssueType::Bug),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubIssueType {
  SubTask,
  Bug,
}

impl SubIssueType {
  pub fn label(&self) -> &'static str {
    match self {
      SubIssueType::SubTask => "SubTask",
      SubIssueType::Bug => "Bug",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    match label {
      "SubTask" => Some(SubIssueType::SubTask),
      "Bug" => Some(SubIssueType::Bug),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
  High,
  Medium,
  Low,
}

impl Priority {
  pub fn label(&self) -> &'static str {
    match self {
      Priority::High => "High",
      Priority::Medium => "Medium",
      Priority::Low => "Low",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    match label {
      "High" => Some(Priority::High),
      "Medium" => Some(Priority::Medium),
      "Low" => Some(Priority::Low),
      _ => None,
    }
  }
}

/// User role; gates write-capable UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Manager,
  Developer,
}

/// Current user profile from `/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(rename = "fullName")]
  pub full_name: String,
  pub email: String,
  pub role: Role,
}

/// Assignable user from `/auth/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignableUser {
  #[serde(rename = "fullName")]
  pub full_name: String,
  pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  #[serde(rename = "_id")]
  pub id: String,
  pub name: String,
  pub key: String,
  #[serde(rename = "type")]
  pub project_type: String,
  #[serde(default)]
  pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "sprintName")]
  pub sprint_name: String,
  #[serde(rename = "sprintType")]
  pub sprint_type: String,
  #[serde(rename = "projectId")]
  pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "customId", default)]
  pub custom_id: String,
  pub title: String,
  #[serde(rename = "Summary")]
  pub summary: String,
  pub status: Status,
  #[serde(rename = "issueType")]
  pub issue_type: IssueType,
  pub priority: Priority,
  #[serde(rename = "assignedTo", default)]
  pub assigned_to: String,
  #[serde(rename = "sprintId")]
  pub sprint_id: String,
  #[serde(rename = "projectId")]
  pub project_id: String,
  #[serde(rename = "subIssues", default)]
  pub sub_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubIssue {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "customId", default)]
  pub custom_id: String,
  pub title: String,
  pub summary: String,
  #[serde(rename = "subissueType")]
  pub subissue_type: SubIssueType,
  pub status: Status,
  pub priority: Priority,
  #[serde(rename = "assignedTo", default)]
  pub assigned_to: String,
  #[serde(rename = "parentIssue")]
  pub parent_issue: String,
  #[serde(rename = "projectId", default)]
  pub project_id: String,
  #[serde(rename = "sprintId", default)]
  pub sprint_id: String,
}

// ============================================================================
// Request payloads
// ============================================================================

/// Payload for creating or updating a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPayload {
  pub name: String,
  pub key: String,
  #[serde(rename = "type")]
  pub project_type: String,
}

/// Payload for creating or updating a sprint.
#[derive(Debug, Clone, Serialize)]
pub struct SprintPayload {
  #[serde(rename = "sprintName")]
  pub sprint_name: String,
  #[serde(rename = "sprintType")]
  pub sprint_type: String,
  #[serde(rename = "projectId")]
  pub project_id: String,
}

/// Payload for creating or updating an issue.
#[derive(Debug, Clone, Serialize)]
pub struct IssuePayload {
  pub title: String,
  #[serde(rename = "Summary")]
  pub summary: String,
  pub status: Status,
  #[serde(rename = "issueType")]
  pub issue_type: IssueType,
  pub priority: Priority,
  #[serde(rename = "assignedTo")]
  pub assigned_to: String,
  #[serde(rename = "projectId")]
  pub project_id: String,
}

/// Payload for creating or updating a sub-issue.
#[derive(Debug, Clone, Serialize)]
pub struct SubIssuePayload {
  pub title: String,
  pub summary: String,
  #[serde(rename = "subissueType")]
  pub subissue_type: SubIssueType,
  pub status: Status,
  pub priority: Priority,
  #[serde(rename = "assignedTo")]
  pub assigned_to: String,
}

/// Payload for updating the current user profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
  #[serde(rename = "fullName")]
  pub full_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_issue_wire_format() {
    let json = serde_json::json!({
      "_id": "i1",
      "customId": "ALPHA-1",
      "title": "Fix login",
      "Summary": "Login breaks on empty password",
      "status": "In Progress",
      "issueType": "Bug",
      "priority": "High",
      "assignedTo": "dev@example.com",
      "sprintId": "s1",
      "projectId": "p1"
    });

    let issue: Issue = serde_json::from_value(json).unwrap();
    assert_eq!(issue.id, "i1");
    assert_eq!(issue.status, Status::InProgress);
    assert_eq!(issue.issue_type, IssueType::Bug);
    assert!(issue.sub_issues.is_empty());
  }

  #[test]
  fn test_issue_payload_uses_capitalized_summary() {
    let payload = IssuePayload {
      title: "t".to_string(),
      summary: "s".to_string(),
      status: Status::Open,
      issue_type: IssueType::Task,
      priority: Priority::Low,
      assigned_to: "a".to_string(),
      project_id: "p1".to_string(),
    };

    let value = serde_json::to_value(&payload).unwrap();
    assert!(value.get("Summary").is_some());
    assert!(value.get("summary").is_none());
    assert_eq!(value["status"], "Open");
  }

  #[test]
  fn test_role_is_lowercase_on_the_wire() {
    let profile: UserProfile = serde_json::from_value(serde_json::json!({
      "fullName": "Ada",
      "email": "ada@example.com",
      "role": "manager"
    }))
    .unwrap();
    assert_eq!(profile.role, Role::Manager);
  }
}
