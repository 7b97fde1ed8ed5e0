use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use serde_json::Value;

use crate::api::types::{ProfileUpdate, Role, UserProfile};
use crate::api::ApiError;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::components::{FormField, FormValues, FormView};
use crate::ui::view::{Shortcut, View, ViewAction};

/// The current user's profile
pub struct ProfileView {
  ctx: AppContext,
  profile: QueryBinding<UserProfile>,
}

impl ProfileView {
  pub fn new(ctx: AppContext) -> Self {
    let api = ctx.api.clone();
    let profile = QueryBinding::new(
      ctx.store.clone(),
      QueryKey::user_profile(),
      fetcher(move || {
        let api = api.clone();
        async move { api.me().await }
      }),
    );

    Self { ctx, profile }
  }

  fn edit_form(&self, current: &UserProfile) -> FormView {
    let fields = vec![FormField::text("fullName", "Full name", current.full_name.as_str())];

    let api = self.ctx.api.clone();
    let store = self.ctx.store.clone();

    let mutation = Mutation::new(move |values: FormValues| {
      let api = api.clone();
      async move {
        let payload = ProfileUpdate {
          full_name: values.get("fullName").cloned().unwrap_or_default(),
        };
        let profile = api.update_me(&payload).await?;
        serde_json::to_value(profile).map_err(ApiError::from)
      }
    })
    .on_success(move |_: &Value| {
      store.invalidate(&QueryKey::user_profile());
    });

    FormView::new(&self.ctx, "Edit profile", fields, mutation)
  }
}

impl View for ProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('e') => {
        if let Some(profile) = self.profile.data().cloned() {
          return ViewAction::Push(Box::new(self.edit_form(&profile)));
        }
      }
      KeyCode::Char('r') => self.profile.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    self.profile.poll();
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let mut title = " Profile ".to_string();
    if self.profile.is_fetching() && !self.profile.is_loading() {
      title.push_str("(refreshing...) ");
    }

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.profile.is_loading() {
      frame.render_widget(
        Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    if let Some(error) = self.profile.error() {
      frame.render_widget(
        Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
          .style(Style::default().fg(Color::Red)),
        inner,
      );
      return;
    }

    let profile = match self.profile.data() {
      Some(profile) => profile,
      None => return,
    };

    let role = match profile.role {
      Role::Manager => "Manager",
      Role::Developer => "Developer",
    };

    let lines = vec![
      Line::from(vec![
        Span::styled("Name:  ", Style::default().fg(Color::DarkGray)),
        Span::raw(profile.full_name.clone()),
      ]),
      Line::from(vec![
        Span::styled("Email: ", Style::default().fg(Color::DarkGray)),
        Span::raw(profile.email.clone()),
      ]),
      Line::from(vec![
        Span::styled("Role:  ", Style::default().fg(Color::DarkGray)),
        Span::styled(role, Style::default().fg(Color::Cyan)),
      ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn refresh(&mut self) {
    self.profile.refetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("e", "edit"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
