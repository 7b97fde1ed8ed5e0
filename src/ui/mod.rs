pub mod components;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{App, Mode};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_status_bar(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let breadcrumb = app.breadcrumbs().join(" > ");
  let left = Line::from(vec![
    Span::styled(
      format!(" {} ", app.title()),
      Style::default().fg(Color::Black).bg(Color::Blue),
    ),
    Span::raw(" "),
    Span::styled(breadcrumb, Style::default().fg(Color::Gray)),
  ]);
  frame.render_widget(Paragraph::new(left), area);

  let user = app.user();
  let right = Paragraph::new(format!("{} ({:?}) ", user.full_name, user.role))
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Right);
  frame.render_widget(right, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  match app.mode() {
    Mode::Normal => {
      let mut spans = Vec::new();
      for shortcut in app.current_shortcuts() {
        spans.push(Span::styled(
          format!(" {}", shortcut.key),
          Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled(
          format!(":{} ", shortcut.label),
          Style::default().fg(Color::DarkGray),
        ));
      }
      frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
    Mode::Command => {
      let mut spans = vec![Span::styled(
        format!(":{}", app.command_input()),
        Style::default().fg(Color::Yellow),
      )];

      // Inline autocomplete: the selected suggestion is highlighted and is
      // what Enter will run
      let suggestions = app.autocomplete_suggestions();
      if !suggestions.is_empty() {
        spans.push(Span::raw("   "));
        for (idx, cmd) in suggestions.iter().enumerate() {
          let style = if idx == app.selected_suggestion() {
            Style::default()
              .fg(Color::Black)
              .bg(Color::Yellow)
              .add_modifier(Modifier::BOLD)
          } else {
            Style::default().fg(Color::DarkGray)
          };
          spans.push(Span::styled(format!(" {} ", cmd.name), style));
        }
      }
      frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
  }
}
