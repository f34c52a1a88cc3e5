//! The poster grid: fetched items, the active search, and what is on screen.
//!
//! Everything displayed is derived from (items, search term) in scroll layout
//! and from (items, search term, page size, display page) in paged layout.

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

use crate::api::{ContentItem, Endpoint, PageResponse, PageSource};
use crate::constants::constants;
use crate::feed::{Feed, FetchOutcome};
use crate::lazy::LazyLoader;
use crate::paginator::Paginator;
use crate::scroll::{ScrollMetrics, ScrollState, rows_for};
use crate::search;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
  /// One continuous grid that fetches as you near the bottom.
  #[default]
  Scroll,
  /// Fixed display pages with page-number navigation.
  Paged,
}

impl Layout {
  pub fn label(self) -> &'static str {
    match self {
      Layout::Scroll => "scroll",
      Layout::Paged => "paged",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Layout::Scroll => Layout::Paged,
      Layout::Paged => Layout::Scroll,
    }
  }
}

pub struct Grid {
  feed: Feed,
  endpoint: Endpoint,
  search: String,
  /// Indices into the feed's items matching `search`.
  filtered: Vec<usize>,
  paginator: Paginator,
  scroll: ScrollState,
  lazy: LazyLoader,
  layout: Layout,
  columns: usize,
}

impl Grid {
  pub fn new(endpoint: Endpoint, layout: Layout) -> Self {
    let c = constants();
    let lazy = LazyLoader::new(endpoint.placeholder_url());
    Self {
      feed: Feed::new(),
      endpoint,
      search: String::new(),
      filtered: Vec::new(),
      paginator: Paginator::new(c.display_page_size),
      scroll: ScrollState::new(c.cell_height),
      lazy,
      layout,
      columns: c.grid_columns.max(1),
    }
  }

  pub fn feed(&self) -> &Feed {
    &self.feed
  }

  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }

  pub fn layout(&self) -> Layout {
    self.layout
  }

  pub fn columns(&self) -> usize {
    self.columns
  }

  pub fn search_term(&self) -> &str {
    &self.search
  }

  pub fn paginator(&self) -> &Paginator {
    &self.paginator
  }

  pub fn scroll(&self) -> &ScrollState {
    &self.scroll
  }

  pub fn item(&self, idx: usize) -> Option<&ContentItem> {
    self.feed.items().get(idx)
  }

  /// URL currently shown for the item at `idx`.
  pub fn src(&self, idx: usize) -> &str {
    self.lazy.src(idx)
  }

  pub fn placeholder(&self) -> &str {
    self.lazy.placeholder()
  }

  pub fn filtered_len(&self) -> usize {
    self.filtered.len()
  }

  pub fn set_layout(&mut self, layout: Layout) {
    self.layout = layout;
    self.paginator.reset();
    self.scroll.scroll_to_top();
  }

  // --- Fetching ---

  pub fn begin_fetch(&mut self) -> Option<u32> {
    self.feed.begin()
  }

  /// Apply a page result, then re-derive the filtered list and observe the
  /// new cells.
  pub fn complete_fetch(&mut self, page: u32, result: Result<PageResponse>) -> FetchOutcome {
    let before = self.feed.items().len();
    let outcome = self.feed.complete(page, result);
    if let FetchOutcome::Appended(_) = outcome {
      let needle = self.search_needle();
      for (idx, item) in self.feed.items().iter().enumerate().skip(before) {
        self.lazy.observe(idx, self.endpoint.poster_url(item));
        if search::matches(item, &needle) {
          self.filtered.push(idx);
        }
      }
    }
    outcome
  }

  pub async fn fetch_next_page<S: PageSource>(&mut self, source: &S) -> FetchOutcome {
    let Some(page) = self.begin_fetch() else { return FetchOutcome::Skipped };
    let result = source.fetch_page(page).await;
    self.complete_fetch(page, result)
  }

  /// Whether the grid should request another page right now.
  pub fn wants_more(&self) -> bool {
    if !self.feed.has_more() || self.feed.is_loading() {
      return false;
    }
    match self.layout {
      Layout::Scroll => self.metrics().near_bottom(constants().scroll_trigger_ratio),
      Layout::Paged => self.paginator.is_last(self.filtered.len()),
    }
  }

  /// Drop everything fetched and start over from page 1.
  pub fn reset(&mut self) {
    self.feed.reset();
    self.lazy.reset();
    self.filtered.clear();
    self.paginator.reset();
    self.scroll.scroll_to_top();
  }

  // --- Search ---

  fn search_needle(&self) -> String {
    self.search.to_lowercase()
  }

  /// Replace the search term and refilter locally. Returns to display page 1
  /// and the top of the grid.
  pub fn set_search(&mut self, term: &str) {
    self.search = term.to_string();
    self.filtered = search::filter_indices(self.feed.items(), &self.search);
    self.paginator.reset();
    self.scroll.scroll_to_top();
    debug!(term = %self.search, hits = self.filtered.len(), "grid: search applied");
  }

  // --- Display ---

  /// Item indices in display order for the current layout.
  pub fn displayed(&self) -> &[usize] {
    match self.layout {
      Layout::Scroll => &self.filtered,
      Layout::Paged => self.paginator.slice(&self.filtered),
    }
  }

  pub fn displayed_items(&self) -> Vec<&ContentItem> {
    self.displayed().iter().filter_map(|&i| self.feed.items().get(i)).collect()
  }

  pub fn total_rows(&self) -> usize {
    rows_for(self.displayed().len(), self.columns)
  }

  /// Positions within `displayed()` that fall inside the viewport.
  pub fn visible_range(&self) -> Range<usize> {
    let len = self.displayed().len();
    let start = (self.scroll.offset_rows() * self.columns).min(len);
    let end = ((self.scroll.offset_rows() + self.scroll.visible_rows()) * self.columns).min(len);
    start..end
  }

  /// Swap in real URLs for visible cells. Returns the URLs to download.
  pub fn intersect_visible(&mut self) -> Vec<String> {
    let range = self.visible_range();
    let keys: Vec<usize> = self.displayed()[range].to_vec();
    self.lazy.intersect(keys)
  }

  pub fn poster_failed(&mut self, url: &str) -> usize {
    self.lazy.fail(url)
  }

  // --- Scrolling ---

  pub fn metrics(&self) -> ScrollMetrics {
    let loader_line = u32::from(self.feed.has_more());
    self.scroll.metrics(self.total_rows(), loader_line)
  }

  pub fn show_back_to_top(&self) -> bool {
    self.metrics().show_back_to_top()
  }

  pub fn set_viewport(&mut self, height: u16) {
    let rows = self.total_rows();
    self.scroll.set_viewport(height, rows);
  }

  /// Scroll by `delta` cell rows. Returns whether a fetch should follow.
  pub fn scroll_by(&mut self, delta: isize) -> bool {
    let rows = self.total_rows();
    self.scroll.scroll_by(delta, rows);
    self.wants_more()
  }

  pub fn scroll_to_top(&mut self) {
    self.scroll.scroll_to_top();
  }

  pub fn scroll_to_bottom(&mut self) -> bool {
    let rows = self.total_rows();
    self.scroll.scroll_to_bottom(rows);
    self.wants_more()
  }

  // --- Display pages ---

  /// Jump to display page `page`. Returns whether a fetch should follow.
  pub fn set_page(&mut self, page: usize) -> bool {
    self.paginator.set_page(page, self.filtered.len());
    self.scroll.scroll_to_top();
    self.wants_more()
  }

  pub fn next_page(&mut self) -> bool {
    self.set_page(self.paginator.current() + 1)
  }

  pub fn prev_page(&mut self) -> bool {
    self.set_page(self.paginator.current().saturating_sub(1))
  }

  pub fn total_pages(&self) -> usize {
    self.paginator.total_pages(self.filtered.len())
  }
}
