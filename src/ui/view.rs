use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the status bar
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Actions that a view can request in response to user input or a tick
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input and return actions for the App to execute.
/// This creates a clean delegation chain: App → View → Components.
///
/// Views that load data asynchronously hold a `QueryBinding<T>` and poll it
/// in `tick()`; views that write hold a `Mutation<I, T>` and poll that too.
/// A tick may itself produce an action (e.g. a form popping itself once its
/// save lands).
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll bindings and mutations
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Force a refetch of whatever this view is showing
  fn refresh(&mut self) {}

  /// True while the view is capturing free text (forms); the app then
  /// forwards every printable key instead of treating them as shortcuts
  fn wants_text_input(&self) -> bool {
    false
  }

  /// Keyboard shortcuts to display in the status bar
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command"),
      Shortcut::new("j/k", "nav"),
      Shortcut::new("q", "back"),
    ]
  }
}
