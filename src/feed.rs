//! Page-at-a-time fetcher for the content feed.
//!
//! The fetcher owns the append-only item list, the fetch cursor, and the
//! `has_more` flag. The event loop drives it in two halves (`begin` when a
//! request is spawned, `complete` when its result arrives) so the UI never
//! blocks on the network.

use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::api::{ContentItem, PageResponse, PageSource};

/// What a completed page request did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Items were appended and the cursor advanced.
  Appended(usize),
  /// The page was empty; the feed is exhausted.
  Exhausted,
  /// The server refused the page; the feed is exhausted.
  Rejected(u16),
  /// Transport or parse error; state left unchanged.
  Failed(String),
  /// Nothing was requested (exhausted or already in flight).
  Skipped,
}

#[derive(Debug)]
pub struct Feed {
  items: Vec<ContentItem>,
  cursor: u32,
  has_more: bool,
  in_flight: Option<u32>,
  last_fetched: Option<DateTime<Local>>,
}

impl Default for Feed {
  fn default() -> Self {
    Self::new()
  }
}

impl Feed {
  pub fn new() -> Self {
    Self { items: Vec::new(), cursor: 1, has_more: true, in_flight: None, last_fetched: None }
  }

  pub fn items(&self) -> &[ContentItem] {
    &self.items
  }

  /// Next page number to request.
  pub fn cursor(&self) -> u32 {
    self.cursor
  }

  pub fn has_more(&self) -> bool {
    self.has_more
  }

  pub fn is_loading(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn last_fetched(&self) -> Option<DateTime<Local>> {
    self.last_fetched
  }

  /// Drop all items and start again from page 1.
  pub fn reset(&mut self) {
    info!(dropped = self.items.len(), "feed: reset");
    *self = Self::new();
  }

  /// Claim the next page for a request. Returns `None` when the feed is
  /// exhausted or a request is already outstanding.
  pub fn begin(&mut self) -> Option<u32> {
    if !self.has_more || self.in_flight.is_some() {
      return None;
    }
    self.in_flight = Some(self.cursor);
    Some(self.cursor)
  }

  /// Apply the result of the request for `page`.
  ///
  /// A result for a page other than the one in flight (e.g. one that raced a
  /// `reset`) is ignored.
  pub fn complete(&mut self, page: u32, result: Result<PageResponse>) -> FetchOutcome {
    if self.in_flight != Some(page) {
      warn!(page, in_flight = ?self.in_flight, "feed: dropping stale page result");
      return FetchOutcome::Skipped;
    }
    self.in_flight = None;

    match result {
      Ok(PageResponse::Status(status)) => {
        info!(page, status, "feed: non-success response, pagination stopped");
        self.has_more = false;
        FetchOutcome::Rejected(status)
      }
      Ok(PageResponse::Items(items)) if items.is_empty() => {
        info!(page, total = self.items.len(), "feed: empty page, pagination complete");
        self.has_more = false;
        FetchOutcome::Exhausted
      }
      Ok(PageResponse::Items(items)) => {
        let count = items.len();
        self.items.extend(items);
        self.cursor += 1;
        self.last_fetched = Some(Local::now());
        info!(page, count, total = self.items.len(), "feed: page appended");
        FetchOutcome::Appended(count)
      }
      Err(e) => {
        let msg = format!("{:#}", e);
        warn!(page, err = %msg, "feed: fetch failed");
        FetchOutcome::Failed(msg)
      }
    }
  }

  /// Fetch the next page from `source` and apply it.
  pub async fn fetch_next_page<S: PageSource>(&mut self, source: &S) -> FetchOutcome {
    let Some(page) = self.begin() else { return FetchOutcome::Skipped };
    let result = source.fetch_page(page).await;
    self.complete(page, result)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use anyhow::anyhow;
  use std::collections::VecDeque;
  use std::future::Future;
  use std::sync::Mutex as StdMutex;

  pub(crate) fn item(id: &str, name: &str) -> ContentItem {
    ContentItem { id: id.to_string(), poster_image: format!("poster{}.jpg", id), name: name.to_string() }
  }

  /// Scripted page source that records requested page numbers.
  pub(crate) struct FakeSource {
    replies: StdMutex<VecDeque<Result<PageResponse>>>,
    pub(crate) requests: StdMutex<Vec<u32>>,
  }

  impl FakeSource {
    pub(crate) fn new(replies: Vec<Result<PageResponse>>) -> Self {
      Self { replies: StdMutex::new(replies.into()), requests: StdMutex::new(Vec::new()) }
    }

    pub(crate) fn requested(&self) -> Vec<u32> {
      self.requests.lock().unwrap().clone()
    }
  }

  impl PageSource for FakeSource {
    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageResponse>> + Send {
      self.requests.lock().unwrap().push(page);
      let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(PageResponse::Items(Vec::new())));
      async move { reply }
    }
  }

  fn page(ids: &[&str]) -> Result<PageResponse> {
    Ok(PageResponse::Items(ids.iter().map(|id| item(id, &format!("Image {}", id))).collect()))
  }

  #[tokio::test]
  async fn two_pages_append_in_order() {
    let source = FakeSource::new(vec![page(&["1", "2"]), page(&["3", "4"])]);
    let mut feed = Feed::new();

    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Appended(2));
    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Appended(2));

    let ids: Vec<&str> = feed.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3", "4"]);
    assert_eq!(feed.cursor(), 3);
    assert_eq!(source.requested(), [1, 2]);
    assert!(feed.last_fetched().is_some());
  }

  #[tokio::test]
  async fn empty_page_stops_pagination() {
    let source = FakeSource::new(vec![page(&["1"]), page(&[])]);
    let mut feed = Feed::new();

    feed.fetch_next_page(&source).await;
    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Exhausted);
    assert!(!feed.has_more());

    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Skipped);
    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Skipped);
    assert_eq!(source.requested(), [1, 2]);
    assert_eq!(feed.items().len(), 1);
  }

  #[tokio::test]
  async fn non_success_status_stops_pagination() {
    let source = FakeSource::new(vec![Ok(PageResponse::Status(404))]);
    let mut feed = Feed::new();

    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Rejected(404));
    assert!(!feed.has_more());
    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Skipped);
    assert_eq!(source.requested(), [1]);
  }

  #[tokio::test]
  async fn network_error_keeps_feed_retriable() {
    let source = FakeSource::new(vec![Err(anyhow!("connection reset")), page(&["1"])]);
    let mut feed = Feed::new();

    let outcome = feed.fetch_next_page(&source).await;
    assert!(matches!(outcome, FetchOutcome::Failed(ref msg) if msg.contains("connection reset")));
    assert!(feed.has_more());
    assert_eq!(feed.cursor(), 1);
    assert!(!feed.is_loading());

    assert_eq!(feed.fetch_next_page(&source).await, FetchOutcome::Appended(1));
    assert_eq!(source.requested(), [1, 1]);
  }

  #[test]
  fn begin_guards_in_flight_page() {
    let mut feed = Feed::new();
    assert_eq!(feed.begin(), Some(1));
    assert_eq!(feed.begin(), None);
    assert!(feed.is_loading());
    feed.complete(1, page(&["1"]));
    assert_eq!(feed.begin(), Some(2));
  }

  #[test]
  fn stale_result_after_reset_is_ignored() {
    let mut feed = Feed::new();
    feed.begin();
    feed.reset();
    assert_eq!(feed.complete(1, page(&["1"])), FetchOutcome::Skipped);
    assert!(feed.items().is_empty());
    assert_eq!(feed.begin(), Some(1));
  }

  #[test]
  fn reset_restores_fresh_state() {
    let mut feed = Feed::new();
    feed.begin();
    feed.complete(1, page(&["1", "2"]));
    feed.begin();
    feed.complete(2, Ok(PageResponse::Status(500)));
    feed.reset();
    assert!(feed.items().is_empty());
    assert!(feed.has_more());
    assert_eq!(feed.cursor(), 1);
  }
}
