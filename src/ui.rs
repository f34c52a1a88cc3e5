use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, Padding, Paragraph},
};

use crate::app::{App, AppMode};
use crate::display::DisplayMode;
use crate::graphics::PosterWidget;
use crate::grid;
use crate::lazy::PosterState;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` display columns, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
  if s.width() <= max_width {
    return s.to_string();
  }
  let mut out = String::new();
  let mut used = 0;
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if used + w + 1 > max_width {
      break;
    }
    used += w;
    out.push(c);
  }
  out.push('…');
  out
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.gfx.frame.clear();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let show_search = app.mode == AppMode::Search || !app.input.is_empty();
  let pager_height = u16::from(app.grid.layout() == grid::Layout::Paged);
  let [header_area, search_area, grid_area, pager_area, status_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(if show_search { 3 } else { 0 }),
    Constraint::Min(3),
    Constraint::Length(pager_height),
    Constraint::Length(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if show_search {
    render_search(frame, app, search_area);
  }
  render_grid(frame, app, grid_area);
  if pager_height > 0 {
    render_pager(frame, app, pager_area);
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);
}

/// Nav bar: back marker on the left, counts and search marker on the right.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(vec![
    Span::styled(" ◀ ", Style::default().fg(theme.key_fg).bg(theme.accent)),
    Span::styled(" posters ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
  ]);
  frame.render_widget(left, area);

  let feed = app.grid.feed();
  let loaded = feed.items().len();
  let shown = app.grid.filtered_len();
  let count = if app.grid.search_term().is_empty() {
    format!("{} loaded", loaded)
  } else {
    format!("{} of {} match", shown, loaded)
  };
  let right = format!("{}  ⌕ ", count);
  let right_w = unicode_width::UnicodeWidthStr::width(right.as_str()) as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(right_w), width: right_w.min(area.width), ..area };
  frame.render_widget(Line::from(Span::styled(right, Style::default().fg(theme.muted))), right_area);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Search;
  let border_color = if focused { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(" Search ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);

  if focused && inner_w > 0 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let columns = app.grid.columns();
  let loader_h = u16::from(app.grid.feed().has_more() && app.grid.layout() == grid::Layout::Scroll);
  let cells_area = Rect { height: area.height.saturating_sub(loader_h), ..area };
  app.grid.set_viewport(cells_area.height);

  if app.grid.displayed().is_empty() {
    render_empty(frame, app, area);
    return;
  }

  let cell_h = app.grid.scroll().cell_height();
  let cell_w = cells_area.width / columns as u16;
  let offset = app.grid.scroll().offset_rows();
  let range = app.grid.visible_range();

  for pos in range.clone() {
    let Some(&idx) = app.grid.displayed().get(pos) else { continue };
    let row = (pos / columns - offset) as u16;
    let col = (pos % columns) as u16;
    let cell = Rect {
      x: cells_area.x + col * cell_w,
      y: cells_area.y.saturating_add(row.saturating_mul(cell_h)),
      width: cell_w.saturating_sub(1),
      height: cell_h,
    };
    // The last row may only partly fit.
    let cell = cell.intersection(cells_area);
    render_cell(frame, app, theme, idx, cell);
  }

  let at_bottom = range.end >= app.grid.displayed().len();
  if loader_h > 0 && at_bottom && area.height > 0 {
    let loader = Rect { y: area.y + area.height - 1, height: 1, ..area };
    let text = if app.grid.feed().is_loading() { "Loading..." } else { "Scroll for more" };
    frame.render_widget(
      Paragraph::new(text).alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
      loader,
    );
  }

  if app.grid.show_back_to_top() {
    let label = " ↑ Back to Top (g) ";
    let w = unicode_width::UnicodeWidthStr::width(label) as u16;
    let badge = Rect {
      x: area.x + area.width.saturating_sub(w + 1),
      y: area.y + area.height.saturating_sub(1),
      width: w.min(area.width),
      height: 1,
    };
    frame.render_widget(Clear, badge);
    frame.render_widget(Paragraph::new(label).style(Style::default().fg(theme.key_fg).bg(theme.accent)), badge);
  }
}

fn render_cell(frame: &mut Frame, app: &mut App, theme: &Theme, idx: usize, cell: Rect) {
  if cell.width == 0 || cell.height < 2 {
    return;
  }
  let image_area = Rect { height: cell.height - 1, ..cell };
  let caption_area = Rect { y: cell.y + cell.height - 1, height: 1, ..cell };

  let name = app.grid.item(idx).map(|i| i.display_name().to_string()).unwrap_or_default();
  frame.render_widget(
    Paragraph::new(truncate_str(&name, caption_area.width as usize))
      .style(Style::default().fg(theme.fg).bg(theme.caption_bg)),
    caption_area,
  );

  // Fall back to the placeholder until the real poster is decoded.
  let src = app.grid.src(idx).to_string();
  let placeholder = app.grid.placeholder().to_string();
  let url = match app.posters.state(&src) {
    Some(PosterState::Ready(_)) => src,
    _ => placeholder,
  };
  let loading = app.posters.is_loading(app.grid.src(idx));

  if app.posters.image(&url).is_none() {
    let text = if loading { "Loading…" } else { "No poster" };
    frame.render_widget(
      Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.muted))
        .block(Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))),
      image_area,
    );
    return;
  }

  if app.display_mode == DisplayMode::Kitty {
    app.gfx.frame.push((url, image_area));
    return;
  }

  let (px, py) = app.display_mode.cell_pixels();
  let w = u32::from(image_area.width) * px;
  let h = u32::from(image_area.height) * py;
  if let Some(image) = app.posters.resized(&url, w, h) {
    frame.render_widget(PosterWidget { image, display_mode: app.display_mode }, image_area);
  }
}

fn render_empty(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let feed = app.grid.feed();
  let message = if feed.is_loading() {
    "Loading..."
  } else if !app.grid.search_term().is_empty() {
    "No posters match your search."
  } else if !feed.has_more() {
    "No posters available."
  } else {
    "Press r to load posters."
  };
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(message, Style::default().fg(theme.fg))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

/// Page-number controls for the paged layout: `‹ 1 2 [3] 4 ›`.
fn render_pager(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let total = app.grid.total_pages();
  let current = app.grid.paginator().current();
  let mut spans = vec![Span::styled("‹ ", Style::default().fg(theme.muted))];
  for n in pager_window(current, total, 9) {
    if n == current {
      spans.push(Span::styled(
        format!(" {} ", n),
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD),
      ));
    } else {
      spans.push(Span::styled(format!(" {} ", n), Style::default().fg(theme.fg)));
    }
  }
  if app.grid.feed().has_more() {
    spans.push(Span::styled(" …", Style::default().fg(theme.muted)));
  }
  spans.push(Span::styled(" ›", Style::default().fg(theme.muted)));
  frame.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

/// Up to `width` page numbers centered on `current`.
fn pager_window(current: usize, total: usize, width: usize) -> std::ops::RangeInclusive<usize> {
  if total == 0 {
    return 1..=0;
  }
  let half = width / 2;
  let start = current.saturating_sub(half).max(1);
  let end = (start + width - 1).min(total);
  let start = end.saturating_sub(width - 1).max(1);
  start..=end
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    let feed = app.grid.feed();
    match feed.last_fetched() {
      Some(at) => (
        format!(" Page {} fetched at {}", feed.cursor() - 1, at.format("%H:%M:%S")),
        Style::default().fg(theme.muted),
      ),
      None => (" Ready".to_string(), Style::default().fg(theme.muted)),
    }
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Search => vec![("Enter", "Done"), ("Esc", "Clear")],
    AppMode::Browse => {
      let mut k = vec![("/", "Search"), ("j/k", "Scroll")];
      if app.grid.layout() == grid::Layout::Paged {
        k.push(("h/l", "Page"));
      }
      k.push(("g", "Top"));
      k.push(("r", "Retry"));
      k.push(("^r", "Reload"));
      k.push(("^l", "Layout"));
      k.push(("^t", "Theme"));
      k.push(("q", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let label = format!("{} · {} · {} ", app.grid.layout().label(), app.display_mode.label(), theme.name);
  let right = Line::from(Span::styled(&label, Style::default().fg(theme.muted)));
  let w = label.chars().count() as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(w), width: w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}
