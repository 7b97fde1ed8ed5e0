pub mod issue_detail;
pub mod profile;
pub mod project_detail;
pub mod projects;
pub mod sprint_detail;
