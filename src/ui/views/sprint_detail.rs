use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListItem;
use serde_json::Value;

use crate::api::types::{Issue, IssuePayload, IssueType, Priority, Sprint, Status};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::components::{FormField, FormValues, FormView, PagedList};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::issue_detail::IssueDetailView;

pub const STATUS_OPTIONS: &[&str] = &["Open", "In Progress", "Closed"];
pub const PRIORITY_OPTIONS: &[&str] = &["High", "Medium", "Low"];
const ISSUE_TYPE_OPTIONS: &[&str] = &["Task", "Bug"];

pub fn status_color(status: Status) -> Color {
  match status {
    Status::Open => Color::White,
    Status::InProgress => Color::Yellow,
    Status::Closed => Color::Green,
  }
}

pub fn priority_color(priority: Priority) -> Color {
  match priority {
    Priority::High => Color::Red,
    Priority::Medium => Color::Yellow,
    Priority::Low => Color::DarkGray,
  }
}

/// Issues of a single sprint
pub struct SprintDetailView {
  ctx: AppContext,
  sprint: Sprint,
  issues: QueryBinding<Vec<Issue>>,
  selected: usize,
  delete: Mutation<String, Value>,
  confirm_delete: Option<String>,
}

impl SprintDetailView {
  pub fn new(ctx: AppContext, sprint: Sprint) -> Self {
    let api = ctx.api.clone();
    let sprint_id = sprint.id.clone();
    let issues = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::issues(&sprint.id),
      fetcher(move || {
        let api = api.clone();
        let sprint_id = sprint_id.clone();
        async move { api.issues_for_sprint(&sprint_id).await }
      }),
    );

    let api = ctx.api.clone();
    let store = ctx.store.clone();
    let invalidate_key = QueryKey::issues(&sprint.id);
    let delete = Mutation::new(move |issue_id: String| {
      let api = api.clone();
      async move { api.delete_issue(&issue_id).await }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&invalidate_key);
    });

    Self {
      ctx,
      sprint,
      issues,
      selected: 0,
      delete,
      confirm_delete: None,
    }
  }

  fn selected_issue(&self) -> Option<&Issue> {
    self.issues.data().and_then(|list| list.get(self.selected))
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.issues.data().map(|l| l.len()).unwrap_or(0);
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn issue_form(&self, existing: Option<&Issue>) -> FormView {
    let fields = vec![
      FormField::text(
        "title",
        "Title",
        existing.map(|i| i.title.as_str()).unwrap_or(""),
      ),
      FormField::text(
        "summary",
        "Summary",
        existing.map(|i| i.summary.as_str()).unwrap_or(""),
      ),
      FormField::select(
        "status",
        "Status",
        STATUS_OPTIONS,
        existing.map(|i| i.status.label()).unwrap_or("Open"),
      ),
      FormField::select(
        "type",
        "Type",
        ISSUE_TYPE_OPTIONS,
        existing.map(|i| i.issue_type.label()).unwrap_or("Task"),
      ),
      FormField::select(
        "priority",
        "Priority",
        PRIORITY_OPTIONS,
        existing.map(|i| i.priority.label()).unwrap_or("Medium"),
      ),
      FormField::user(
        "assignee",
        "Assignee",
        existing.map(|i| i.assigned_to.as_str()).unwrap_or(""),
      ),
    ];

    let api = self.ctx.api.clone();
    let id = existing.map(|i| i.id.clone());
    let sprint_id = self.sprint.id.clone();
    let project_id = self.sprint.project_id.clone();
    let store = self.ctx.store.clone();
    let invalidate_key = QueryKey::issues(&self.sprint.id);

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      let id = id.clone();
      let sprint_id = sprint_id.clone();
      let project_id = project_id.clone();
      async move {
        let get = |name: &str| values.get(name).cloned().unwrap_or_default();
        let payload = IssuePayload {
          title: get("title"),
          summary: get("summary"),
          status: Status::from_label(&get("status")).unwrap_or(Status::Open),
          issue_type: IssueType::from_label(&get("type")).unwrap_or(IssueType::Task),
          priority: Priority::from_label(&get("priority")).unwrap_or(Priority::Medium),
          assigned_to: get("assignee"),
          project_id,
        };
        let issue = match id {
          Some(id) => api.update_issue(&id, &payload).await?,
          None => api.create_issue(&sprint_id, &payload).await?,
        };
        serde_json::to_value(issue).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&invalidate_key);
    });

    let title = if existing.is_some() {
      "Edit issue"
    } else {
      "New issue"
    };
    FormView::new(&self.ctx, title, fields, mutation)
  }
}

impl View for SprintDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Delete asks for a second press; any other key cancels it
    if let Some(pending) = self.confirm_delete.take() {
      if key.code == KeyCode::Char('d') {
        self.delete.mutate(pending);
        return ViewAction::None;
      }
    }

    match key.code {
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Left | KeyCode::Char('h') => {
        self.move_selection(-(self.ctx.page_size as i32));
      }
      KeyCode::Right | KeyCode::Char('l') => {
        self.move_selection(self.ctx.page_size as i32);
      }
      KeyCode::Enter => {
        if let Some(issue) = self.selected_issue() {
          return ViewAction::Push(Box::new(IssueDetailView::new(
            self.ctx.clone(),
            issue.clone(),
          )));
        }
      }
      KeyCode::Char('n') => {
        return ViewAction::Push(Box::new(self.issue_form(None)));
      }
      KeyCode::Char('e') => {
        if let Some(issue) = self.selected_issue().cloned() {
          return ViewAction::Push(Box::new(self.issue_form(Some(&issue))));
        }
      }
      KeyCode::Char('d') => {
        if let Some(issue) = self.selected_issue() {
          self.confirm_delete = Some(issue.id.clone());
        }
      }
      KeyCode::Char('r') => self.issues.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if self.issues.poll() {
      let len = self.issues.data().map(|l| l.len()).unwrap_or(0);
      if len > 0 && self.selected >= len {
        self.selected = len - 1;
      }
    }
    self.delete.poll();
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = self
      .issues
      .data()
      .map(|list| {
        list
          .iter()
          .map(|issue| {
            ListItem::new(Line::from(vec![
              Span::styled(
                format!("{:<10}", issue.custom_id),
                Style::default().fg(Color::Cyan),
              ),
              Span::styled(
                format!("{:<12}", issue.status.label()),
                Style::default().fg(status_color(issue.status)),
              ),
              Span::styled(
                format!("{:<8}", issue.priority.label()),
                Style::default().fg(priority_color(issue.priority)),
              ),
              Span::raw(issue.title.clone()),
            ]))
          })
          .collect()
      })
      .unwrap_or_default();

    let status = if self.confirm_delete.is_some() {
      Some("Press 'd' again to delete")
    } else if self.delete.is_pending() {
      Some("Deleting...")
    } else {
      self.delete.error()
    };

    PagedList {
      title: format!("{} - Issues", self.sprint.sprint_name),
      items,
      selected: self.selected,
      page_size: self.ctx.page_size,
      loading: self.issues.is_loading(),
      fetching: self.issues.is_fetching(),
      error: self.issues.error(),
      empty_message: "No issues in this sprint yet.",
      status,
    }
    .draw(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.sprint.sprint_name.clone()
  }

  fn refresh(&mut self) {
    self.issues.refetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Enter", "detail"),
      Shortcut::new("n", "new"),
      Shortcut::new("e", "edit"),
      Shortcut::new("d", "delete"),
      Shortcut::new("r", "refresh"),
    ]
  }
}
