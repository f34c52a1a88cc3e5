use std::ops::Range;

/// Fixed-size display pages over an already-fetched list.
///
/// Display pages are 1-based and unrelated to the fetch cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
  page_size: usize,
  current: usize,
}

impl Paginator {
  pub fn new(page_size: usize) -> Self {
    Self { page_size: page_size.max(1), current: 1 }
  }

  pub fn current(&self) -> usize {
    self.current
  }

  /// `ceil(len / page_size)`.
  pub fn total_pages(&self, len: usize) -> usize {
    len.div_ceil(self.page_size)
  }

  /// Jump to `page`, clamped to the pages that exist for `len` items.
  pub fn set_page(&mut self, page: usize, len: usize) {
    self.current = page.clamp(1, self.total_pages(len).max(1));
  }

  pub fn next(&mut self, len: usize) {
    self.set_page(self.current + 1, len);
  }

  pub fn prev(&mut self, len: usize) {
    self.set_page(self.current.saturating_sub(1), len);
  }

  pub fn reset(&mut self) {
    self.current = 1;
  }

  pub fn is_last(&self, len: usize) -> bool {
    self.current >= self.total_pages(len)
  }

  /// Index range of the current page within a list of `len` items.
  pub fn range(&self, len: usize) -> Range<usize> {
    let start = ((self.current - 1) * self.page_size).min(len);
    let end = (self.current * self.page_size).min(len);
    start..end
  }

  pub fn slice<'a, T>(&self, list: &'a [T]) -> &'a [T] {
    &list[self.range(list.len())]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn third_page_of_25_holds_one_item() {
    let list: Vec<usize> = (0..25).collect();
    let mut p = Paginator::new(12);
    assert_eq!(p.total_pages(list.len()), 3);
    p.set_page(3, list.len());
    assert_eq!(p.slice(&list), [24]);
  }

  #[test]
  fn first_page_is_full() {
    let list: Vec<usize> = (0..25).collect();
    let p = Paginator::new(12);
    assert_eq!(p.slice(&list).len(), 12);
    assert_eq!(p.range(25), 0..12);
  }

  #[test]
  fn total_pages_rounds_up() {
    let p = Paginator::new(12);
    assert_eq!(p.total_pages(0), 0);
    assert_eq!(p.total_pages(12), 1);
    assert_eq!(p.total_pages(13), 2);
  }

  #[test]
  fn set_page_clamps() {
    let mut p = Paginator::new(12);
    p.set_page(9, 25);
    assert_eq!(p.current(), 3);
    p.set_page(0, 25);
    assert_eq!(p.current(), 1);
    p.set_page(4, 0);
    assert_eq!(p.current(), 1);
    assert!(p.slice::<u8>(&[]).is_empty());
  }

  #[test]
  fn next_prev_walk_pages() {
    let mut p = Paginator::new(12);
    p.next(25);
    p.next(25);
    p.next(25);
    assert_eq!(p.current(), 3);
    assert!(p.is_last(25));
    p.prev(25);
    assert_eq!(p.current(), 2);
    p.reset();
    assert_eq!(p.current(), 1);
  }

  #[test]
  fn range_stays_in_bounds_after_list_shrinks() {
    let mut p = Paginator::new(12);
    p.set_page(3, 30);
    assert_eq!(p.range(5), 5..5);
  }
}
