use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListItem;
use serde_json::Value;

use crate::api::types::{Project, ProjectPayload};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::components::{FormField, FormValues, FormView, PagedList};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::project_detail::ProjectDetailView;

/// Root view: all projects on the server
pub struct ProjectsView {
  ctx: AppContext,
  projects: QueryBinding<Vec<Project>>,
  selected: usize,
  notice: Option<String>,
}

impl ProjectsView {
  pub fn new(ctx: AppContext) -> Self {
    let api = ctx.api.clone();
    let projects = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::projects(),
      fetcher(move || {
        let api = api.clone();
        async move { api.list_projects().await }
      }),
    );

    Self {
      ctx,
      projects,
      selected: 0,
      notice: None,
    }
  }

  fn selected_project(&self) -> Option<&Project> {
    self
      .projects
      .data()
      .and_then(|list| list.get(self.selected))
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.projects.data().map(|l| l.len()).unwrap_or(0);
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn project_form(&self, existing: Option<&Project>) -> FormView {
    let fields = vec![
      FormField::text("name", "Name", existing.map(|p| p.name.as_str()).unwrap_or("")),
      FormField::text("key", "Key", existing.map(|p| p.key.as_str()).unwrap_or("")),
      FormField::text(
        "type",
        "Type",
        existing.map(|p| p.project_type.as_str()).unwrap_or("scrum"),
      ),
    ];

    let api = self.ctx.api.clone();
    let id = existing.map(|p| p.id.clone());
    let store = self.ctx.store.clone();

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      let id = id.clone();
      async move {
        let payload = ProjectPayload {
          name: values.get("name").cloned().unwrap_or_default(),
          key: values.get("key").cloned().unwrap_or_default(),
          project_type: values.get("type").cloned().unwrap_or_default(),
        };
        let project = match id {
          Some(id) => api.update_project(&id, &payload).await?,
          None => api.create_project(&payload).await?,
        };
        serde_json::to_value(project).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&QueryKey::projects());
    });

    let title = if existing.is_some() {
      "Edit project"
    } else {
      "New project"
    };
    FormView::new(&self.ctx, title, fields, mutation)
  }
}

impl View for ProjectsView {
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
        if let Some(project) = self.selected_project() {
          return ViewAction::Push(Box::new(ProjectDetailView::new(
            self.ctx.clone(),
            project.clone(),
          )));
        }
      }
      KeyCode::Char('n') => {
        if self.ctx.is_manager() {
          return ViewAction::Push(Box::new(self.project_form(None)));
        }
        self.notice = Some("Only managers can create projects".to_string());
      }
      KeyCode::Char('e') => {
        if !self.ctx.is_manager() {
          self.notice = Some("Only managers can edit projects".to_string());
        } else if let Some(project) = self.selected_project().cloned() {
          return ViewAction::Push(Box::new(self.project_form(Some(&project))));
        }
      }
      KeyCode::Char('r') => self.projects.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if self.projects.poll() {
      let len = self.projects.data().map(|l| l.len()).unwrap_or(0);
      if len > 0 && self.selected >= len {
        self.selected = len - 1;
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = self
      .projects
      .data()
      .map(|list| {
        list
          .iter()
          .map(|project| {
            ListItem::new(Line::from(vec![
              Span::styled(
                format!("{:<10}", project.key),
                Style::default().fg(Color::Cyan),
              ),
              Span::raw(format!("{:<32}", project.name)),
              Span::styled(
                project.project_type.clone(),
                Style::default().fg(Color::DarkGray),
              ),
            ]))
          })
          .collect()
      })
      .unwrap_or_default();

    PagedList {
      title: "Projects".to_string(),
      items,
      selected: self.selected,
      page_size: self.ctx.page_size,
      loading: self.projects.is_loading(),
      fetching: self.projects.is_fetching(),
      error: self.projects.error(),
      empty_message: "No projects yet.",
      status: self.notice.as_deref(),
    }
    .draw(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn refresh(&mut self) {
    self.projects.refetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new("Enter", "sprints"),
      Shortcut::new("r", "refresh"),
    ];
    if self.ctx.is_manager() {
      shortcuts.push(Shortcut::new("n", "new"));
      shortcuts.push(Shortcut::new("e", "edit"));
    }
    shortcuts
  }
}
