use anyhow::Result;
use image::DynamicImage;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::api::{self, HttpSource, PageResponse, PageSource};
use crate::config::Config;
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::feed::FetchOutcome;
use crate::grid::{Grid, Layout};
use crate::lazy::PosterCache;
use crate::theme::{self, THEMES};

type PosterResult = (String, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Browse,
  Search,
}

/// Kitty placements drawn after each frame.
#[derive(Default)]
pub struct GraphicsCache {
  /// Poster URL and cell area for every Kitty poster in the current frame.
  pub frame: Vec<(String, Rect)>,
  pub last_sent: Vec<(String, Rect)>,
}

/// In-flight async task receivers.
pub(crate) struct AsyncTasks {
  pub(crate) fetch_rx: Option<(u32, oneshot::Receiver<Result<PageResponse>>)>,
  poster_tx: mpsc::Sender<PosterResult>,
  poster_rx: mpsc::Receiver<PosterResult>,
}

impl Default for AsyncTasks {
  fn default() -> Self {
    let (poster_tx, poster_rx) = mpsc::channel(64);
    Self { fetch_rx: None, poster_tx, poster_rx }
  }
}

pub struct App {
  pub grid: Grid,
  pub posters: PosterCache,
  pub source: HttpSource,
  pub display_mode: DisplayMode,
  pub mode: AppMode,
  pub theme_index: usize,
  /// Text being typed into the search bar.
  pub input: String,
  /// Cursor position within `input` (char index).
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, shown below status and error in priority.
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub gfx: GraphicsCache,
  pub(crate) tasks: AsyncTasks,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(source: HttpSource, layout: Layout, display_mode: DisplayMode, theme_index: usize) -> Self {
    let grid = Grid::new(source.endpoint().clone(), layout);
    Self {
      grid,
      posters: PosterCache::default(),
      source,
      display_mode,
      mode: AppMode::Browse,
      theme_index: theme_index.min(THEMES.len() - 1),
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      gfx: GraphicsCache::default(),
      tasks: AsyncTasks::default(),
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    // Safety: theme_index is clamped on construction and advanced modulo THEMES.len().
    &THEMES[self.theme_index]
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after `error_dismiss_secs`.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
  }

  fn save_config(&self) {
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    config.layout = Some(self.grid.layout());
    config.save();
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  pub fn toggle_layout(&mut self) {
    let layout = self.grid.layout().toggled();
    self.grid.set_layout(layout);
    self.info_message = Some(format!("Layout: {}", layout.label()));
    self.save_config();
    self.request_more_if_needed();
  }

  /// The terminal changed size: cell geometry is stale.
  pub fn resized(&mut self) {
    self.posters.clear_resized();
    self.gfx.last_sent.clear();
  }

  // --- Fetching ---

  /// Spawn a request for the next content page, if one is due.
  pub fn trigger_fetch(&mut self) {
    let source = self.source.clone();
    self.spawn_fetch(source);
  }

  /// Request the next page from `source` on a spawned task. The result is
  /// picked up by `check_pending`.
  fn spawn_fetch<S: PageSource + 'static>(&mut self, source: S) {
    let Some(page) = self.grid.begin_fetch() else { return };
    info!(page, "fetch triggered");
    self.status_message = Some(format!("Loading page {}…", page));

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(source.fetch_page(page).await);
    });
    self.tasks.fetch_rx = Some((page, rx));
  }

  pub fn request_more_if_needed(&mut self) {
    if self.grid.wants_more() {
      self.trigger_fetch();
    }
  }

  /// Manual retry after a failed page.
  pub fn retry_fetch(&mut self) {
    if !self.grid.feed().has_more() {
      self.info_message = Some("Nothing more to load.".to_string());
      return;
    }
    self.clear_error();
    self.trigger_fetch();
  }

  /// Drop every fetched item and reload from page 1.
  pub fn reload(&mut self) {
    self.tasks.fetch_rx = None;
    self.grid.reset();
    self.posters.forget_failed();
    self.posters.clear_resized();
    self.gfx.last_sent.clear();
    self.clear_error();
    self.info_message = None;
    let term = self.input.clone();
    self.grid.set_search(&term);
    self.trigger_fetch();
  }

  fn apply_fetch(&mut self, page: u32, result: Result<PageResponse>) {
    self.status_message = None;
    match self.grid.complete_fetch(page, result) {
      FetchOutcome::Appended(count) => {
        debug!(page, count, "page applied");
        // Keep filling until the viewport has something to scroll.
        self.request_more_if_needed();
      }
      FetchOutcome::Exhausted => {
        self.info_message = Some(format!("All {} posters loaded.", self.grid.feed().items().len()));
      }
      FetchOutcome::Rejected(status) => {
        self.info_message = Some(format!("No more pages (HTTP {}).", status));
      }
      FetchOutcome::Failed(msg) => {
        self.set_error(format!("Failed to load page {}: {}", page, msg));
      }
      FetchOutcome::Skipped => {}
    }
  }

  // --- Posters ---

  /// Download any of `urls` not already cached, a few at a time.
  pub fn load_posters(&mut self, urls: Vec<String>) {
    let urls = self.posters.claim(urls);
    if urls.is_empty() {
      return;
    }
    debug!(count = urls.len(), "poster downloads queued");
    let client = self.source.client().clone();
    let tx = self.tasks.poster_tx.clone();
    tokio::spawn(async move {
      use futures::stream::{self, StreamExt};

      stream::iter(urls)
        .map(|url| {
          let client = client.clone();
          let tx = tx.clone();
          async move {
            let result = api::fetch_poster(&client, &url).await;
            let _ = tx.send((url, result)).await;
          }
        })
        .buffer_unordered(constants().poster_concurrency)
        .collect::<()>()
        .await;
    });
  }

  /// Swap in posters for cells rendered in the last frame.
  pub fn after_draw(&mut self) {
    let urls = self.grid.intersect_visible();
    self.load_posters(urls);
  }

  fn apply_poster(&mut self, url: String, result: Result<DynamicImage>) {
    match result {
      Ok(image) => self.posters.insert(url, image),
      Err(e) => {
        let msg = format!("{:#}", e);
        debug!(url = %url, err = %msg, "poster failed, using placeholder");
        let fallen_back = self.grid.poster_failed(&url);
        if url == self.grid.placeholder() {
          warn!(err = %msg, "placeholder poster unavailable");
        }
        self.posters.mark_failed(url);
        if fallen_back > 0 {
          self.gfx.last_sent.clear();
        }
      }
    }
  }

  pub fn check_pending(&mut self) -> Result<()> {
    if let Some((page, mut rx)) = self.tasks.fetch_rx.take() {
      match rx.try_recv() {
        Ok(result) => self.apply_fetch(page, result),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.fetch_rx = Some((page, rx));
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.apply_fetch(page, Err(anyhow::anyhow!("fetch task ended without a result")));
        }
      }
    }

    while let Ok((url, result)) = self.tasks.poster_rx.try_recv() {
      self.apply_poster(url, result);
    }

    Ok(())
  }

  // --- Navigation ---

  pub fn scroll(&mut self, delta: isize) {
    if self.grid.scroll_by(delta) {
      self.trigger_fetch();
    }
  }

  pub fn scroll_to_bottom(&mut self) {
    if self.grid.scroll_to_bottom() {
      self.trigger_fetch();
    }
  }

  pub fn scroll_to_top(&mut self) {
    self.grid.scroll_to_top();
  }

  pub fn set_page(&mut self, page: usize) {
    if self.grid.set_page(page) {
      self.trigger_fetch();
    }
  }

  pub fn next_page(&mut self) {
    if self.grid.next_page() {
      self.trigger_fetch();
    }
  }

  pub fn prev_page(&mut self) {
    if self.grid.prev_page() {
      self.trigger_fetch();
    }
  }

  // --- Search ---

  /// Refilter the grid with the current input.
  pub fn apply_search(&mut self) {
    let term = self.input.clone();
    self.grid.set_search(&term);
    self.gfx.last_sent.clear();
  }

  pub fn clear_search(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.apply_search();
  }
}
