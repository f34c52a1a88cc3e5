use ratatui::crossterm::event::{self, KeyCode, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::app::{App, AppMode};

/// Cell rows moved per mouse wheel notch.
const WHEEL_ROWS: isize = 1;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return;
      }
      KeyCode::Char('l') => {
        app.toggle_layout();
        return;
      }
      KeyCode::Char('r') => {
        app.reload();
        return;
      }
      _ => {}
    }
  }

  match app.mode {
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Search => handle_search_key(app, key),
  }
}

pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
  match mouse.kind {
    MouseEventKind::ScrollDown => app.scroll(WHEEL_ROWS),
    MouseEventKind::ScrollUp => app.scroll(-WHEEL_ROWS),
    _ => {}
  }
}

fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char('q') => {
      app.should_quit = true;
    }
    KeyCode::Char('/') => {
      app.clear_error();
      app.mode = AppMode::Search;
    }
    KeyCode::Down | KeyCode::Char('j') => app.scroll(1),
    KeyCode::Up | KeyCode::Char('k') => app.scroll(-1),
    KeyCode::PageDown => {
      let rows = app.grid.scroll().visible_rows().max(1) as isize;
      app.scroll(rows);
    }
    KeyCode::PageUp => {
      let rows = app.grid.scroll().visible_rows().max(1) as isize;
      app.scroll(-rows);
    }
    KeyCode::Home | KeyCode::Char('g') => app.scroll_to_top(),
    KeyCode::End | KeyCode::Char('G') => app.scroll_to_bottom(),
    KeyCode::Right | KeyCode::Char('l') => app.next_page(),
    KeyCode::Left | KeyCode::Char('h') => app.prev_page(),
    KeyCode::Char(c @ '1'..='9') => {
      if let Some(page) = c.to_digit(10) {
        app.set_page(page as usize);
      }
    }
    KeyCode::Char('r') => app.retry_fetch(),
    KeyCode::Backspace => {
      debug!("back requested");
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.clear_search();
      } else {
        app.should_quit = true;
      }
    }
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.apply_search();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.apply_search();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.apply_search();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Enter | KeyCode::Down => {
      app.mode = AppMode::Browse;
    }
    KeyCode::Esc => {
      app.clear_search();
      app.mode = AppMode::Browse;
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Endpoint, HttpSource, PageResponse};
  use crate::display::DisplayMode;
  use crate::feed::tests::item;
  use crate::grid::Layout;
  use ratatui::crossterm::event::KeyEvent;

  fn app_with(names: &[&str]) -> App {
    let source = HttpSource::new(Endpoint::new("http://127.0.0.1:9")).unwrap();
    let mut app = App::new(source, Layout::Paged, DisplayMode::Ascii, 0);
    let page = app.grid.begin_fetch().unwrap();
    let items = names.iter().enumerate().map(|(i, n)| item(&i.to_string(), n)).collect();
    app.grid.complete_fetch(page, Ok(PageResponse::Items(items)));
    app
  }

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c));
    }
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5);
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日";
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- search mode ---

  #[test]
  fn typing_filters_as_you_go() {
    let mut app = app_with(&["The Birds", "Rear Window", "Vertigo"]);
    press(&mut app, KeyCode::Char('/'));
    assert_eq!(app.mode, AppMode::Search);

    type_str(&mut app, "WIN");
    assert_eq!(app.input, "WIN");
    assert_eq!(app.grid.displayed(), [1]);

    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    assert_eq!(app.grid.displayed().len(), 3);
  }

  #[test]
  fn esc_clears_search_and_returns_to_browse() {
    let mut app = app_with(&["The Birds", "Rear Window"]);
    press(&mut app, KeyCode::Char('/'));
    type_str(&mut app, "bird");
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode, AppMode::Browse);
    assert!(app.input.is_empty());
    assert_eq!(app.grid.displayed().len(), 2);
  }

  #[test]
  fn enter_keeps_filter_active() {
    let mut app = app_with(&["The Birds", "Rear Window"]);
    press(&mut app, KeyCode::Char('/'));
    type_str(&mut app, "bird");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.mode, AppMode::Browse);
    assert_eq!(app.grid.displayed(), [0]);
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.grid.displayed().len(), 2);
    assert!(!app.should_quit);
  }

  #[test]
  fn digit_jumps_display_page() {
    let names: Vec<String> = (0..20).map(|i| format!("Poster {}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut app = app_with(&refs);
    // Exhaust the feed so page changes never spawn a fetch.
    let page = app.grid.begin_fetch().unwrap();
    app.grid.complete_fetch(page, Ok(PageResponse::Items(Vec::new())));

    press(&mut app, KeyCode::Char('2'));
    assert_eq!(app.grid.paginator().current(), 2);
    assert_eq!(app.grid.displayed().len(), 8);
    press(&mut app, KeyCode::Char('h'));
    assert_eq!(app.grid.paginator().current(), 1);
  }

  #[test]
  fn q_quits_in_browse_only() {
    let mut app = app_with(&["A"]);
    press(&mut app, KeyCode::Char('/'));
    press(&mut app, KeyCode::Char('q'));
    assert!(!app.should_quit);
    assert_eq!(app.input, "q");
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char('q'));
    assert!(app.should_quit);
  }
}
