use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, ListItem, Paragraph};
use serde_json::Value;

use crate::api::types::{
  Issue, IssuePayload, IssueType, Priority, Status, SubIssue, SubIssuePayload, SubIssueType,
};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::components::{FormField, FormValues, FormView, PagedList};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::sprint_detail::{
  priority_color, status_color, PRIORITY_OPTIONS, STATUS_OPTIONS,
};

const SUBISSUE_TYPE_OPTIONS: &[&str] = &["SubTask", "Bug"];
const ISSUE_TYPE_OPTIONS: &[&str] = &["Task", "Bug"];

/// One issue: its fields plus the list of sub-issues beneath it.
///
/// The issue itself is looked up by id rather than carried from the parent
/// list, so an edit saved from this screen shows up after the refetch.
pub struct IssueDetailView {
  ctx: AppContext,
  initial: Issue,
  issue: QueryBinding<Issue>,
  subissues: QueryBinding<Vec<SubIssue>>,
  selected: usize,
  delete: Mutation<String, Value>,
  confirm_delete: Option<String>,
}

impl IssueDetailView {
  pub fn new(ctx: AppContext, initial: Issue) -> Self {
    let api = ctx.api.clone();
    let issue_id = initial.id.clone();
    let issue = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::issue(&initial.id),
      fetcher(move || {
        let api = api.clone();
        let issue_id = issue_id.clone();
        async move { api.find_issue(&issue_id).await }
      }),
    );

    let api = ctx.api.clone();
    let issue_id = initial.id.clone();
    let subissues = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::subissues(&initial.id),
      fetcher(move || {
        let api = api.clone();
        let issue_id = issue_id.clone();
        async move { api.subissues_for_issue(&issue_id).await }
      }),
    );

    let api = ctx.api.clone();
    let store = ctx.store.clone();
    let invalidate_key = QueryKey::subissues(&initial.id);
    let delete = Mutation::new(move |subissue_id: String| {
      let api = api.clone();
      async move { api.delete_subissue(&subissue_id).await }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&invalidate_key);
    });

    Self {
      ctx,
      initial,
      issue,
      subissues,
      selected: 0,
      delete,
      confirm_delete: None,
    }
  }

  /// The freshest copy of the issue we have
  fn current_issue(&self) -> &Issue {
    self.issue.data().unwrap_or(&self.initial)
  }

  fn selected_subissue(&self) -> Option<&SubIssue> {
    self
      .subissues
      .data()
      .and_then(|list| list.get(self.selected))
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.subissues.data().map(|l| l.len()).unwrap_or(0);
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn issue_form(&self) -> FormView {
    let issue = self.current_issue();
    let fields = vec![
      FormField::text("title", "Title", issue.title.as_str()),
      FormField::text("summary", "Summary", issue.summary.as_str()),
      FormField::select("status", "Status", STATUS_OPTIONS, issue.status.label()),
      FormField::select("type", "Type", ISSUE_TYPE_OPTIONS, issue.issue_type.label()),
      FormField::select(
        "priority",
        "Priority",
        PRIORITY_OPTIONS,
        issue.priority.label(),
      ),
      FormField::user("assignee", "Assignee", issue.assigned_to.as_str()),
    ];

    let api = self.ctx.api.clone();
    let id = issue.id.clone();
    let project_id = issue.project_id.clone();
    let store = self.ctx.store.clone();
    let issue_key = QueryKey::issue(&issue.id);
    let issues_key = QueryKey::issues(&issue.sprint_id);

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      let id = id.clone();
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
        let issue = api.update_issue(&id, &payload).await?;
        serde_json::to_value(issue).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&issue_key);
      store.invalidate(&issues_key);
    });

    FormView::new(&self.ctx, "Edit issue", fields, mutation)
  }

  fn subissue_form(&self, existing: Option<&SubIssue>) -> FormView {
    let fields = vec![
      FormField::text(
        "title",
        "Title",
        existing.map(|s| s.title.as_str()).unwrap_or(""),
      ),
      FormField::text(
        "summary",
        "Summary",
        existing.map(|s| s.summary.as_str()).unwrap_or(""),
      ),
      FormField::select(
        "status",
        "Status",
        STATUS_OPTIONS,
        existing.map(|s| s.status.label()).unwrap_or("Open"),
      ),
      FormField::select(
        "type",
        "Type",
        SUBISSUE_TYPE_OPTIONS,
        existing.map(|s| s.subissue_type.label()).unwrap_or("SubTask"),
      ),
      FormField::select(
        "priority",
        "Priority",
        PRIORITY_OPTIONS,
        existing.map(|s| s.priority.label()).unwrap_or("Medium"),
      ),
      FormField::user(
        "assignee",
        "Assignee",
        existing.map(|s| s.assigned_to.as_str()).unwrap_or(""),
      ),
    ];

    let api = self.ctx.api.clone();
    let id = existing.map(|s| s.id.clone());
    let issue_id = self.initial.id.clone();
    let store = self.ctx.store.clone();
    let invalidate_key = QueryKey::subissues(&self.initial.id);

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      let id = id.clone();
      let issue_id = issue_id.clone();
      async move {
        let get = |name: &str| values.get(name).cloned().unwrap_or_default();
        let payload = SubIssuePayload {
          title: get("title"),
          summary: get("summary"),
          subissue_type: SubIssueType::from_label(&get("type")).unwrap_or(SubIssueType::SubTask),
          status: Status::from_label(&get("status")).unwrap_or(Status::Open),
          priority: Priority::from_label(&get("priority")).unwrap_or(Priority::Medium),
          assigned_to: get("assignee"),
        };
        let subissue = match id {
          Some(id) => api.update_subissue(&id, &payload).await?,
          None => api.create_subissue(&issue_id, &payload).await?,
        };
        serde_json::to_value(subissue).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&invalidate_key);
    });

    let title = if existing.is_some() {
      "Edit sub-issue"
    } else {
      "New sub-issue"
    };
    FormView::new(&self.ctx, title, fields, mutation)
  }
}

impl View for IssueDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(pending) = self.confirm_delete.take() {
      if key.code == KeyCode::Char('d') {
        self.delete.mutate(pending);
        return ViewAction::None;
      }
    }

    match key.code {
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Char('i') => return ViewAction::Push(Box::new(self.issue_form())),
      KeyCode::Char('n') => return ViewAction::Push(Box::new(self.subissue_form(None))),
      KeyCode::Char('e') => {
        if let Some(subissue) = self.selected_subissue().cloned() {
          return ViewAction::Push(Box::new(self.subissue_form(Some(&subissue))));
        }
      }
      KeyCode::Char('d') => {
        if let Some(subissue) = self.selected_subissue() {
          self.confirm_delete = Some(subissue.id.clone());
        }
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.issue.poll();
    if self.subissues.poll() {
      let len = self.subissues.data().map(|l| l.len()).unwrap_or(0);
      if len > 0 && self.selected >= len {
        self.selected = len - 1;
      }
    }
    self.delete.poll();
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(6), Constraint::Min(3)])
      .split(area);

    self.render_header(frame, chunks[0]);
    self.render_subissues(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    let issue = self.current_issue();
    if issue.custom_id.is_empty() {
      issue.title.clone()
    } else {
      issue.custom_id.clone()
    }
  }

  fn refresh(&mut self) {
    self.issue.refetch();
    self.subissues.refetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("i", "edit issue"),
      Shortcut::new("n", "new sub-issue"),
      Shortcut::new("e", "edit"),
      Shortcut::new("d", "delete"),
      Shortcut::new("r", "refresh"),
    ]
  }
}

impl IssueDetailView {
  fn render_header(&self, frame: &mut Frame, area: Rect) {
    let issue = self.current_issue();
    let mut title = format!(" {} ", self.breadcrumb_label());
    if self.issue.is_fetching() {
      title.push_str("(refreshing...) ");
    }

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let assignee = if issue.assigned_to.is_empty() {
      "Unassigned"
    } else {
      issue.assigned_to.as_str()
    };

    let lines = vec![
      Line::from(vec![
        Span::styled("Title:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(issue.title.clone()),
      ]),
      Line::from(vec![
        Span::styled("Summary:  ", Style::default().fg(Color::DarkGray)),
        Span::raw(issue.summary.clone()),
      ]),
      Line::from(vec![
        Span::styled("Status:   ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          issue.status.label(),
          Style::default().fg(status_color(issue.status)),
        ),
        Span::raw("  "),
        Span::styled("Priority: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          issue.priority.label(),
          Style::default().fg(priority_color(issue.priority)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Assignee: ", Style::default().fg(Color::DarkGray)),
        Span::raw(assignee.to_string()),
      ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn render_subissues(&self, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = self
      .subissues
      .data()
      .map(|list| {
        list
          .iter()
          .map(|subissue| {
            ListItem::new(Line::from(vec![
              Span::styled(
                format!("{:<10}", subissue.subissue_type.label()),
                Style::default().fg(Color::Cyan),
              ),
              Span::styled(
                format!("{:<12}", subissue.status.label()),
                Style::default().fg(status_color(subissue.status)),
              ),
              Span::styled(
                format!("{:<8}", subissue.priority.label()),
                Style::default().fg(priority_color(subissue.priority)),
              ),
              Span::raw(subissue.title.clone()),
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
      title: "Sub-issues".to_string(),
      items,
      selected: self.selected,
      page_size: self.ctx.page_size,
      loading: self.subissues.is_loading(),
      fetching: self.subissues.is_fetching(),
      error: self.subissues.error(),
      empty_message: "No sub-issues yet.",
      status,
    }
    .draw(frame, area);
  }
}
