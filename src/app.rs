use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

use crate::api::types::{Role, UserProfile};
use crate::api::ApiClient;
use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::session::SessionStore;
use crate::store::QueryStore;
use crate::ui;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::profile::ProfileView;
use crate::ui::views::projects::ProjectsView;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Shared handles every view needs: the API client, the query cache, the
/// signed-in user (for role gating) and display settings.
#[derive(Clone)]
pub struct AppContext {
  pub api: ApiClient,
  pub store: QueryStore,
  pub user: UserProfile,
  pub page_size: usize,
}

impl AppContext {
  pub fn is_manager(&self) -> bool {
    self.user.role == Role::Manager
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Header title (config override or the API host)
  title: String,

  ctx: AppContext,

  sessions: SessionStore,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    config: &Config,
    api: ApiClient,
    sessions: SessionStore,
    user: UserProfile,
  ) -> Result<Self> {
    let title = config
      .title
      .clone()
      .unwrap_or_else(|| config.api.base_url.clone());

    let ctx = AppContext {
      api,
      store: QueryStore::new(),
      user,
      page_size: config.page_size,
    };

    Ok(Self {
      view_stack: vec![Box::new(ProjectsView::new(ctx.clone()))],
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      title,
      ctx,
      sessions,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick_views(),
    }
  }

  fn tick_views(&mut self) {
    let last = self.view_stack.len().saturating_sub(1);
    let mut top_action = ViewAction::None;
    for (idx, view) in self.view_stack.iter_mut().enumerate() {
      let action = view.tick();
      if idx == last {
        top_action = action;
      }
    }
    self.apply_action(top_action);
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Forms capture free text, so ':' only opens the command bar outside them
    let in_text_input = self
      .view_stack
      .last()
      .map(|v| v.wants_text_input())
      .unwrap_or(false);

    if key.code == KeyCode::Char(':') && !in_text_input {
      self.mode = Mode::Command;
      self.command_input.clear();
      self.selected_suggestion = 0;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply_action(action);
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    // Either the selected suggestion or the raw input
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = if let Some(suggestion) = suggestions.get(self.selected_suggestion) {
      suggestion.name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    match cmd.as_str() {
      "projects" => {
        self.view_stack = vec![Box::new(ProjectsView::new(self.ctx.clone()))];
      }
      "profile" => {
        self
          .view_stack
          .push(Box::new(ProfileView::new(self.ctx.clone())));
      }
      "refresh" => {
        if let Some(view) = self.view_stack.last_mut() {
          view.refresh();
        }
      }
      "logout" => self.logout(),
      "quit" => {
        self.should_quit = true;
      }
      _ => {}
    }
    self.command_input.clear();
  }

  /// Tear down the session: forget the stored token, drop the client's
  /// credentials, release every unwatched cache entry, and exit.
  fn logout(&mut self) {
    info!("Logging out");
    if let Err(e) = self.sessions.clear() {
      tracing::warn!("Failed to clear stored session: {}", e);
    }
    self.ctx.api.clear_token();
    self.view_stack.clear();
    self.ctx.store.evict_unused();
    self.should_quit = true;
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn user(&self) -> &UserProfile {
    &self.ctx.user
  }

  pub fn breadcrumbs(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn current_shortcuts(&self) -> Vec<Shortcut> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
