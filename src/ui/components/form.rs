//! A modal form view for create/edit operations.
//!
//! The form owns the mutation that persists it: Enter collects the field
//! values and starts the mutation, and the form pops itself once the save
//! lands. Validation failures from the server stick in the footer until the
//! next attempt. Assignee fields pull their options from the shared users
//! query, so every open form on the session reuses one fetch.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use serde_json::Value;

use crate::api::types::AssignableUser;
use crate::app::AppContext;
use crate::mutation::Mutation;
use crate::query::{fetcher, QueryBinding};
use crate::store::QueryKey;
use crate::ui::view::{Shortcut, View, ViewAction};

/// Collected field values keyed by field name, handed to the mutation runner
pub type FormValues = HashMap<&'static str, String>;

enum FieldInput {
  Text(String),
  Select {
    options: &'static [&'static str],
    selected: usize,
  },
  /// Assignee picker; options come from the users query once it loads.
  /// `want` holds the value to preselect when editing an existing record.
  User {
    selected: usize,
    want: Option<String>,
  },
}

pub struct FormField {
  name: &'static str,
  label: &'static str,
  input: FieldInput,
}

impl FormField {
  pub fn text(name: &'static str, label: &'static str, initial: impl Into<String>) -> Self {
    Self {
      name,
      label,
      input: FieldInput::Text(initial.into()),
    }
  }

  pub fn select(
    name: &'static str,
    label: &'static str,
    options: &'static [&'static str],
    current: &str,
  ) -> Self {
    let selected = options.iter().position(|o| *o == current).unwrap_or(0);
    Self {
      name,
      label,
      input: FieldInput::Select { options, selected },
    }
  }

  pub fn user(name: &'static str, label: &'static str, current: &str) -> Self {
    let want = if current.is_empty() {
      None
    } else {
      Some(current.to_string())
    };
    Self {
      name,
      label,
      input: FieldInput::User { selected: 0, want },
    }
  }
}

pub struct FormView {
  title: String,
  fields: Vec<FormField>,
  focused: usize,
  users: Option<QueryBinding<Vec<AssignableUser>>>,
  mutation: Mutation<FormValues, Value>,
}

impl FormView {
  pub fn new(
    ctx: &AppContext,
    title: impl Into<String>,
    fields: Vec<FormField>,
    mutation: Mutation<FormValues, Value>,
  ) -> Self {
    let needs_users = fields
      .iter()
      .any(|f| matches!(f.input, FieldInput::User { .. }));

    let users = needs_users.then(|| {
      let api = ctx.api.clone();
      QueryBinding::new(
        ctx.store.clone(),
        QueryKey::users(),
        fetcher(move || {
          let api = api.clone();
          async move { api.list_users().await }
        }),
      )
    });

    Self {
      title: title.into(),
      fields,
      focused: 0,
      users,
      mutation,
    }
  }

  fn user_options(&self) -> &[AssignableUser] {
    self
      .users
      .as_ref()
      .and_then(|q| q.data())
      .map(|u| u.as_slice())
      .unwrap_or(&[])
  }

  fn field_value(&self, field: &FormField) -> String {
    match &field.input {
      FieldInput::Text(value) => value.clone(),
      FieldInput::Select { options, selected } => {
        options.get(*selected).copied().unwrap_or("").to_string()
      }
      FieldInput::User { selected, .. } => self
        .user_options()
        .get(*selected)
        .map(|u| u.email.clone())
        .unwrap_or_default(),
    }
  }

  fn collect(&self) -> FormValues {
    self
      .fields
      .iter()
      .map(|f| (f.name, self.field_value(f)))
      .collect()
  }

  fn cycle(&mut self, delta: i32) {
    let user_count = self.user_options().len();
    if let Some(field) = self.fields.get_mut(self.focused) {
      match &mut field.input {
        FieldInput::Select { options, selected } => {
          let len = options.len();
          if len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        FieldInput::User { selected, .. } => {
          if user_count > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(user_count as i32) as usize;
          }
        }
        FieldInput::Text(_) => {}
      }
    }
  }

  fn resolve_pending_user_selection(&mut self) {
    let options: Vec<String> = self.user_options().iter().map(|u| u.email.clone()).collect();
    for field in &mut self.fields {
      if let FieldInput::User { selected, want } = &mut field.input {
        if let Some(wanted) = want.take() {
          if let Some(pos) = options.iter().position(|email| *email == wanted) {
            *selected = pos;
          }
        }
      }
    }
  }
}

impl View for FormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Enter => {
        if !self.mutation.is_pending() {
          let values = self.collect();
          self.mutation.mutate(values);
        }
      }
      KeyCode::Tab | KeyCode::Down => {
        if !self.fields.is_empty() {
          self.focused = (self.focused + 1) % self.fields.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        if !self.fields.is_empty() {
          self.focused = self.focused.checked_sub(1).unwrap_or(self.fields.len() - 1);
        }
      }
      KeyCode::Left => self.cycle(-1),
      KeyCode::Right => self.cycle(1),
      KeyCode::Backspace => {
        if let Some(FormField {
          input: FieldInput::Text(value),
          ..
        }) = self.fields.get_mut(self.focused)
        {
          value.pop();
        }
      }
      KeyCode::Char(c) => {
        if let Some(FormField {
          input: FieldInput::Text(value),
          ..
        }) = self.fields.get_mut(self.focused)
        {
          value.push(c);
        }
      }
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(users) = &mut self.users {
      if users.poll() {
        self.resolve_pending_user_selection();
      }
    }

    // A settled mutation with no error means the save landed; close the form.
    if self.mutation.poll() && self.mutation.error().is_none() {
      return ViewAction::Pop;
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, field) in self.fields.iter().enumerate() {
      let focused = idx == self.focused;
      let marker = if focused { "> " } else { "  " };
      let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::DarkGray)
      };

      let rendered_value = match &field.input {
        FieldInput::Text(value) => {
          if focused {
            format!("{}_", value)
          } else {
            value.clone()
          }
        }
        FieldInput::Select { options, selected } => {
          format!("< {} >", options.get(*selected).copied().unwrap_or(""))
        }
        FieldInput::User { selected, .. } => {
          let options = self.user_options();
          if options.is_empty() {
            "< loading users... >".to_string()
          } else {
            let user = &options[(*selected).min(options.len() - 1)];
            format!("< {} ({}) >", user.full_name, user.email)
          }
        }
      };

      lines.push(Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{:<12}", field.label), label_style),
        Span::raw(rendered_value),
      ]));
      lines.push(Line::raw(""));
    }

    if self.mutation.is_pending() {
      lines.push(Line::styled("Saving...", Style::default().fg(Color::Yellow)));
    } else if let Some(error) = self.mutation.error() {
      lines.push(Line::styled(
        error.to_string(),
        Style::default().fg(Color::Red),
      ));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn breadcrumb_label(&self) -> String {
    self.title.clone()
  }

  fn wants_text_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Tab", "next field"),
      Shortcut::new("←/→", "pick"),
      Shortcut::new("Enter", "save"),
      Shortcut::new("Esc", "cancel"),
    ]
  }
}
