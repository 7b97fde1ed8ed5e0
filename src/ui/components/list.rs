use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// The slice of a list visible on the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
  pub start: usize,
  pub end: usize,
  pub page: usize,
  pub pages: usize,
}

/// Compute the page containing `selected`
pub fn page_window(len: usize, page_size: usize, selected: usize) -> PageWindow {
  let page_size = page_size.max(1);
  if len == 0 {
    return PageWindow {
      start: 0,
      end: 0,
      page: 0,
      pages: 1,
    };
  }
  let pages = len.div_ceil(page_size);
  let page = (selected.min(len - 1)) / page_size;
  let start = page * page_size;
  let end = (start + page_size).min(len);
  PageWindow {
    start,
    end,
    page,
    pages,
  }
}

/// A bordered, paginated list with loading/error/empty states
pub struct PagedList<'a> {
  pub title: String,
  pub items: Vec<ListItem<'a>>,
  pub selected: usize,
  pub page_size: usize,
  pub loading: bool,
  pub fetching: bool,
  pub error: Option<&'a str>,
  pub empty_message: &'a str,
  pub status: Option<&'a str>,
}

impl PagedList<'_> {
  pub fn draw(self, frame: &mut Frame, area: Rect) {
    let mut title = format!(" {} ", self.title);
    if self.fetching && !self.loading {
      title.push_str("(refreshing...) ");
    }

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.loading {
      let paragraph = Paragraph::new("Loading...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    if self.items.is_empty() {
      if let Some(error) = self.error {
        let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
          .block(block)
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, area);
      } else {
        let paragraph = Paragraph::new(self.empty_message)
          .block(block)
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
      }
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let total = self.items.len();
    let window = page_window(total, self.page_size, self.selected);
    let visible: Vec<ListItem> = self
      .items
      .into_iter()
      .skip(window.start)
      .take(window.end - window.start)
      .collect();

    let list = List::new(visible)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(self.selected.min(total - 1) - window.start));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    // Footer: page indicator on the left, transient status on the right
    let footer_left = format!(
      " page {}/{}  {} item{}",
      window.page + 1,
      window.pages,
      total,
      if total == 1 { "" } else { "s" }
    );
    frame.render_widget(
      Paragraph::new(footer_left).style(Style::default().fg(Color::DarkGray)),
      chunks[1],
    );

    // Stale data keeps rendering through a failed refetch; the error only
    // gets the footer
    if let Some(note) = self.status.or(self.error) {
      let msg = Paragraph::new(note.to_string())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Right);
      frame.render_widget(msg, chunks[1]);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_list_is_single_page() {
    let w = page_window(0, 5, 0);
    assert_eq!(w.pages, 1);
    assert_eq!(w.start, 0);
    assert_eq!(w.end, 0);
  }

  #[test]
  fn test_exact_multiple_pages() {
    let w = page_window(10, 5, 7);
    assert_eq!(w.pages, 2);
    assert_eq!(w.page, 1);
    assert_eq!(w.start, 5);
    assert_eq!(w.end, 10);
  }

  #[test]
  fn test_partial_last_page() {
    let w = page_window(12, 5, 11);
    assert_eq!(w.pages, 3);
    assert_eq!(w.page, 2);
    assert_eq!(w.start, 10);
    assert_eq!(w.end, 12);
  }

  #[test]
  fn test_selection_past_end_is_clamped() {
    let w = page_window(3, 5, 99);
    assert_eq!(w.page, 0);
    assert_eq!(w.end, 3);
  }
}
