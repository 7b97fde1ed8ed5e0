use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListItem;
use serde_json::Value;

use crate::api::types::{Project, Sprint, SprintPayload};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::components::{FormField, FormValues, FormView, PagedList};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::sprint_detail::SprintDetailView;

/// Sprints of a single project
pub struct ProjectDetailView {
  ctx: AppContext,
  project: Project,
  sprints: QueryBinding<Vec<Sprint>>,
  selected: usize,
  notice: Option<String>,
}

impl ProjectDetailView {
  pub fn new(ctx: AppContext, project: Project) -> Self {
    let api = ctx.api.clone();
    let project_id = project.id.clone();
    let sprints = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::sprints(&project.id),
      fetcher(move || {
        let api = api.clone();
        let project_id = project_id.clone();
        async move { api.sprints_for_project(&project_id).await }
      }),
    );

    Self {
      ctx,
      project,
      sprints,
      selected: 0,
      notice: None,
    }
  }

  fn selected_sprint(&self) -> Option<&Sprint> {
    self.sprints.data().and_then(|list| list.get(self.selected))
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.sprints.data().map(|l| l.len()).unwrap_or(0);
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn sprint_form(&self, existing: Option<&Sprint>) -> FormView {
    let fields = vec![
      FormField::text(
        "name",
        "Name",
        existing.map(|s| s.sprint_name.as_str()).unwrap_or(""),
      ),
      FormField::text(
        "type",
        "Type",
        existing.map(|s| s.sprint_type.as_str()).unwrap_or("active"),
      ),
    ];

    let api = self.ctx.api.clone();
    let id = existing.map(|s| s.id.clone());
    let project_id = self.project.id.clone();
    let store = self.ctx.store.clone();
    let invalidate_key = QueryKey::sprints(&self.project.id);

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      let id = id.clone();
      let project_id = project_id.clone();
      async move {
        let payload = SprintPayload {
          sprint_name: values.get("name").cloned().unwrap_or_default(),
          sprint_type: values.get("type").cloned().unwrap_or_default(),
          project_id,
        };
        let sprint = match id {
          Some(id) => api.update_sprint(&id, &payload).await?,
          None => api.create_sprint(&payload).await?,
        };
        serde_json::to_value(sprint).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&invalidate_key);
    });

    let title = if existing.is_some() {
      "Edit sprint"
    } else {
      "New sprint"
    };
    FormView::new(&self.ctx, title, fields, mutation)
  }
}

impl View for ProjectDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self.notice = None;
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
        if let Some(sprint) = self.selected_sprint() {
          return ViewAction::Push(Box::new(SprintDetailView::new(
            self.ctx.clone(),
            sprint.clone(),
          )));
        }
      }
      KeyCode::Char('n') => {
        if self.ctx.is_manager() {
          return ViewAction::Push(Box::new(self.sprint_form(None)));
        }
        self.notice = Some("Only managers can create sprints".to_string());
      }
      KeyCode::Char('e') => {
        if !self.ctx.is_manager() {
          self.notice = Some("Only managers can edit sprints".to_string());
        } else if let Some(sprint) = self.selected_sprint().cloned() {
          return ViewAction::Push(Box::new(self.sprint_form(Some(&sprint))));
        }
      }
      KeyCode::Char('r') => self.sprints.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if self.sprints.poll() {
      let len = self.sprints.data().map(|l| l.len()).unwrap_or(0);
      if len > 0 && self.selected >= len {
        self.selected = len - 1;
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = self
      .sprints
      .data()
      .map(|list| {
        list
          .iter()
          .map(|sprint| {
            ListItem::new(Line::from(vec![
              Span::raw(format!("{:<32}", sprint.sprint_name)),
              Span::styled(
                sprint.sprint_type.clone(),
                Style::default().fg(Color::DarkGray),
              ),
            ]))
          })
          .collect()
      })
      .unwrap_or_default();

    PagedList {
      title: format!("{} - Sprints", self.project.name),
      items,
      selected: self.selected,
      page_size: self.ctx.page_size,
      loading: self.sprints.is_loading(),
      fetching: self.sprints.is_fetching(),
      error: self.sprints.error(),
      empty_message: "No sprints in this project yet.",
      status: self.notice.as_deref(),
    }
    .draw(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.project.key.clone()
  }

  fn refresh(&mut self) {
    self.sprints.refetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new("Enter", "issues"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ];
    if self.ctx.is_manager() {
      shortcuts.push(Shortcut::new("n", "new"));
      shortcuts.push(Shortcut::new("e", "edit"));
    }
    shortcuts
  }
}
