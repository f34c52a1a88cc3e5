//! Viewport scroll tracking for the poster grid.
//!
//! All measurements are in terminal lines. The grid scrolls by whole cell
//! rows so posters are never clipped.

/// Snapshot of the viewport geometry taken on a scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
  pub scroll_top: u32,
  pub scroll_height: u32,
  pub client_height: u32,
}

impl ScrollMetrics {
  /// True when the remaining content is within `ratio` viewports.
  pub fn near_bottom(&self, ratio: f64) -> bool {
    let remaining = self.scroll_height.saturating_sub(self.scroll_top);
    f64::from(remaining) <= f64::from(self.client_height) * ratio
  }

  /// The "back to top" affordance shows once a full viewport is scrolled past.
  pub fn show_back_to_top(&self) -> bool {
    self.scroll_top > self.client_height
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollState {
  /// First visible cell row.
  offset_rows: usize,
  /// Cell rows that fit in the viewport, updated on every render.
  visible_rows: usize,
  cell_height: u16,
}

impl ScrollState {
  pub fn new(cell_height: u16) -> Self {
    Self { offset_rows: 0, visible_rows: 0, cell_height: cell_height.max(1) }
  }

  pub fn offset_rows(&self) -> usize {
    self.offset_rows
  }

  pub fn visible_rows(&self) -> usize {
    self.visible_rows
  }

  pub fn cell_height(&self) -> u16 {
    self.cell_height
  }

  /// Record the viewport height (lines) and keep the offset in range.
  pub fn set_viewport(&mut self, height: u16, total_rows: usize) {
    self.visible_rows = (height / self.cell_height).max(1) as usize;
    self.clamp(total_rows);
  }

  pub fn scroll_by(&mut self, delta: isize, total_rows: usize) {
    self.offset_rows = self.offset_rows.saturating_add_signed(delta);
    self.clamp(total_rows);
  }

  pub fn scroll_to_top(&mut self) {
    self.offset_rows = 0;
  }

  pub fn scroll_to_bottom(&mut self, total_rows: usize) {
    self.offset_rows = total_rows;
    self.clamp(total_rows);
  }

  fn clamp(&mut self, total_rows: usize) {
    let max = total_rows.saturating_sub(self.visible_rows);
    self.offset_rows = self.offset_rows.min(max);
  }

  /// Metrics in lines. `extra_lines` covers trailing content such as the
  /// loading row.
  pub fn metrics(&self, total_rows: usize, extra_lines: u32) -> ScrollMetrics {
    let h = u32::from(self.cell_height);
    ScrollMetrics {
      scroll_top: self.offset_rows as u32 * h,
      scroll_height: total_rows as u32 * h + extra_lines,
      client_height: self.visible_rows as u32 * h,
    }
  }
}

/// Number of cell rows needed for `items` posters in `columns` columns.
pub fn rows_for(items: usize, columns: usize) -> usize {
  items.div_ceil(columns.max(1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn near_bottom_threshold() {
    let m = ScrollMetrics { scroll_top: 0, scroll_height: 150, client_height: 100 };
    assert!(m.near_bottom(1.5));
    let m = ScrollMetrics { scroll_top: 0, scroll_height: 151, client_height: 100 };
    assert!(!m.near_bottom(1.5));
    let m = ScrollMetrics { scroll_top: 51, scroll_height: 201, client_height: 100 };
    assert!(m.near_bottom(1.5));
  }

  #[test]
  fn short_content_is_near_bottom() {
    let m = ScrollMetrics { scroll_top: 0, scroll_height: 0, client_height: 40 };
    assert!(m.near_bottom(1.5));
  }

  #[test]
  fn back_to_top_after_one_viewport() {
    let m = ScrollMetrics { scroll_top: 100, scroll_height: 500, client_height: 100 };
    assert!(!m.show_back_to_top());
    let m = ScrollMetrics { scroll_top: 101, ..m };
    assert!(m.show_back_to_top());
  }

  #[test]
  fn scroll_clamps_to_content() {
    let mut s = ScrollState::new(10);
    s.set_viewport(30, 10);
    assert_eq!(s.visible_rows(), 3);
    s.scroll_by(100, 10);
    assert_eq!(s.offset_rows(), 7);
    s.scroll_by(-3, 10);
    assert_eq!(s.offset_rows(), 4);
    s.scroll_by(-100, 10);
    assert_eq!(s.offset_rows(), 0);
    s.scroll_to_bottom(10);
    assert_eq!(s.offset_rows(), 7);
    s.scroll_to_top();
    assert_eq!(s.offset_rows(), 0);
  }

  #[test]
  fn metrics_in_lines() {
    let mut s = ScrollState::new(10);
    s.set_viewport(25, 8);
    s.scroll_by(2, 8);
    let m = s.metrics(8, 1);
    assert_eq!(m, ScrollMetrics { scroll_top: 20, scroll_height: 81, client_height: 20 });
  }

  #[test]
  fn rows_round_up() {
    assert_eq!(rows_for(0, 3), 0);
    assert_eq!(rows_for(7, 3), 3);
    assert_eq!(rows_for(9, 3), 3);
  }
}
