//! Structural keys identifying cached remote-data queries.

use std::fmt;

/// Identifier for a logical query, e.g. `["issues", sprint_id]`.
///
/// Equality and hashing are structural (component-wise), so two keys built
/// from the same segments always address the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  pub fn new<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(segments.into_iter().map(Into::into).collect())
  }

  /// Whether this key starts with the given prefix; used for predicate
  /// invalidation (e.g. every `["issues", ..]` entry).
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
  }

  // Constructors for every logical query the app issues. Segment layout
  // mirrors the server resources one-to-one.

  pub fn projects() -> Self {
    Self::new(["projects"])
  }

  pub fn project(project_id: &str) -> Self {
    Self::new(["project", project_id])
  }

  pub fn sprints(project_id: &str) -> Self {
    Self::new(["sprints", project_id])
  }

  pub fn sprint(sprint_id: &str) -> Self {
    Self::new(["sprint", sprint_id])
  }

  pub fn issues(sprint_id: &str) -> Self {
    Self::new(["issues", sprint_id])
  }

  pub fn issue(issue_id: &str) -> Self {
    Self::new(["issue", issue_id])
  }

  pub fn subissues(issue_id: &str) -> Self {
    Self::new(["subissues", issue_id])
  }

  pub fn user_profile() -> Self {
    Self::new(["user-profile"])
  }

  pub fn users() -> Self {
    Self::new(["users"])
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.join("/"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_structural_equality() {
    assert_eq!(QueryKey::issues("s1"), QueryKey::new(["issues", "s1"]));
    assert_ne!(QueryKey::issues("s1"), QueryKey::issues("s2"));
    assert_ne!(QueryKey::issues("s1"), QueryKey::subissues("s1"));
    // Single-resource keys never collide with their list counterparts.
    assert_ne!(QueryKey::project("p1"), QueryKey::projects());
    assert_ne!(QueryKey::sprint("s1"), QueryKey::sprints("s1"));
  }

  #[test]
  fn test_prefix_matching() {
    let prefix = QueryKey::new(["issues"]);
    assert!(QueryKey::issues("s1").starts_with(&prefix));
    assert!(QueryKey::issues("s2").starts_with(&prefix));
    assert!(!QueryKey::projects().starts_with(&prefix));

    // A full key is its own prefix.
    assert!(QueryKey::issues("s1").starts_with(&QueryKey::issues("s1")));
    // But a longer key is not a prefix of a shorter one.
    assert!(!QueryKey::new(["issues"]).starts_with(&QueryKey::issues("s1")));
  }

  #[test]
  fn test_display() {
    assert_eq!(QueryKey::issues("s1").to_string(), "issues/s1");
  }
}
