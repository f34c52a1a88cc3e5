//! Lazy poster loading.
//!
//! Every grid cell starts out showing the placeholder poster. The first time
//! a cell is rendered inside the viewport its real URL is swapped in and the
//! cell stops being observed, so the swap happens exactly once per cell.
//! Downloads are keyed by URL and cached for the life of the feed.

use image::DynamicImage;
use image::imageops::FilterType;
use std::collections::HashMap;
use tracing::debug;

/// One observed poster cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyImage {
  /// URL currently displayed.
  pub src: String,
  /// Real poster URL, swapped in on first visibility.
  pub data_src: String,
  observed: bool,
}

#[derive(Debug)]
pub struct LazyLoader {
  placeholder: String,
  elements: HashMap<usize, LazyImage>,
}

impl LazyLoader {
  pub fn new(placeholder: String) -> Self {
    Self { placeholder, elements: HashMap::new() }
  }

  pub fn placeholder(&self) -> &str {
    &self.placeholder
  }

  /// Start observing cell `key`. Cells already known keep their state.
  pub fn observe(&mut self, key: usize, data_src: String) {
    let placeholder = &self.placeholder;
    self
      .elements
      .entry(key)
      .or_insert_with(|| LazyImage { src: placeholder.clone(), data_src, observed: true });
  }

  /// Cells that became visible. Returns the URLs newly swapped in, in the
  /// order given, one entry per swapped cell.
  pub fn intersect(&mut self, keys: impl IntoIterator<Item = usize>) -> Vec<String> {
    let mut swapped = Vec::new();
    for key in keys {
      if let Some(el) = self.elements.get_mut(&key)
        && el.observed
      {
        el.src = el.data_src.clone();
        el.observed = false;
        swapped.push(el.src.clone());
      }
    }
    swapped
  }

  /// A download for `url` failed: every cell showing it falls back to the
  /// placeholder. Returns how many cells changed.
  pub fn fail(&mut self, url: &str) -> usize {
    let mut changed = 0;
    for el in self.elements.values_mut().filter(|el| el.src == url && el.src != self.placeholder) {
      el.src = self.placeholder.clone();
      changed += 1;
    }
    changed
  }

  /// URL currently displayed for `key`; unknown cells show the placeholder.
  pub fn src(&self, key: usize) -> &str {
    self.elements.get(&key).map_or(self.placeholder.as_str(), |el| el.src.as_str())
  }

  /// Disconnect from every cell.
  pub fn reset(&mut self) {
    self.elements.clear();
  }
}

#[derive(Debug)]
pub enum PosterState {
  Loading,
  Ready(DynamicImage),
  Failed,
}

/// Decoded posters keyed by URL, plus per-size resized copies.
#[derive(Debug, Default)]
pub struct PosterCache {
  posters: HashMap<String, PosterState>,
  resized: HashMap<(String, u32, u32), DynamicImage>,
}

impl PosterCache {
  /// Filter `urls` down to those never requested and mark them loading.
  pub fn claim(&mut self, urls: Vec<String>) -> Vec<String> {
    let mut claimed = Vec::new();
    for url in urls {
      if !self.posters.contains_key(&url) {
        self.posters.insert(url.clone(), PosterState::Loading);
        claimed.push(url);
      }
    }
    claimed
  }

  pub fn insert(&mut self, url: String, image: DynamicImage) {
    debug!(url = %url, w = image.width(), h = image.height(), "poster: ready");
    self.posters.insert(url, PosterState::Ready(image));
  }

  pub fn mark_failed(&mut self, url: String) {
    self.posters.insert(url, PosterState::Failed);
  }

  pub fn state(&self, url: &str) -> Option<&PosterState> {
    self.posters.get(url)
  }

  pub fn image(&self, url: &str) -> Option<&DynamicImage> {
    match self.posters.get(url) {
      Some(PosterState::Ready(img)) => Some(img),
      _ => None,
    }
  }

  pub fn is_loading(&self, url: &str) -> bool {
    matches!(self.posters.get(url), Some(PosterState::Loading))
  }

  /// Poster resized to fill `w`x`h` pixels, computed once per size.
  pub fn resized(&mut self, url: &str, w: u32, h: u32) -> Option<&DynamicImage> {
    let key = (url.to_string(), w, h);
    if !self.resized.contains_key(&key) {
      let img = self.image(url)?;
      let fitted = img.resize_to_fill(w.max(1), h.max(1), FilterType::Triangle);
      self.resized.insert(key.clone(), fitted);
    }
    self.resized.get(&key)
  }

  /// Drop every resized copy. Cell sizes change with the terminal.
  pub fn clear_resized(&mut self) {
    self.resized.clear();
  }

  /// Forget failed downloads so the next `claim` requests them again.
  pub fn forget_failed(&mut self) {
    self.posters.retain(|_, state| !matches!(state, PosterState::Failed));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  const PLACEHOLDER: &str = "https://host/images/placeholder.png";

  fn loader() -> LazyLoader {
    let mut l = LazyLoader::new(PLACEHOLDER.to_string());
    l.observe(0, "https://host/images/poster1.jpg".to_string());
    l.observe(1, "https://host/images/poster2.jpg".to_string());
    l
  }

  #[test]
  fn cells_start_on_placeholder() {
    let l = loader();
    assert_eq!(l.src(0), PLACEHOLDER);
    assert_eq!(l.src(42), PLACEHOLDER);
  }

  #[test]
  fn intersecting_cell_swaps_exactly_once() {
    let mut l = loader();
    assert_eq!(l.intersect([0]), ["https://host/images/poster1.jpg"]);
    assert_eq!(l.src(0), "https://host/images/poster1.jpg");

    assert!(l.intersect([0]).is_empty());
    assert!(l.intersect([0, 0]).is_empty());
    assert_eq!(l.intersect([0, 1]), ["https://host/images/poster2.jpg"]);
  }

  #[test]
  fn observe_does_not_rearm_swapped_cell() {
    let mut l = loader();
    l.intersect([0]);
    l.observe(0, "https://host/images/poster1.jpg".to_string());
    assert!(l.intersect([0]).is_empty());
  }

  #[test]
  fn failed_load_falls_back_to_placeholder() {
    let mut l = loader();
    l.intersect([0, 1]);
    assert_eq!(l.fail("https://host/images/poster1.jpg"), 1);
    assert_eq!(l.src(0), PLACEHOLDER);
    assert_eq!(l.src(1), "https://host/images/poster2.jpg");
    assert_eq!(l.fail(PLACEHOLDER), 0);
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let mut l = loader();
    assert!(l.intersect([7]).is_empty());
    l.intersect([0]);
    l.reset();
    assert_eq!(l.src(0), PLACEHOLDER);
    assert!(l.intersect([0]).is_empty());
  }

  #[test]
  fn cache_claims_each_url_once() {
    let mut cache = PosterCache::default();
    let claimed = cache.claim(vec!["a".into(), "b".into(), "a".into()]);
    assert_eq!(claimed, ["a", "b"]);
    assert!(cache.is_loading("a"));
    assert!(cache.claim(vec!["a".into()]).is_empty());
    cache.mark_failed("b".into());
    assert!(matches!(cache.state("b"), Some(PosterState::Failed)));
    assert!(cache.claim(vec!["b".into()]).is_empty());
  }

  #[test]
  fn cache_resizes_ready_posters() {
    let mut cache = PosterCache::default();
    assert!(cache.resized("a", 4, 4).is_none());
    cache.insert("a".into(), DynamicImage::ImageRgb8(RgbImage::new(20, 30)));
    let img = cache.resized("a", 4, 6).unwrap();
    assert_eq!((img.width(), img.height()), (4, 6));
    assert!(cache.image("b").is_none());
  }

  #[test]
  fn forgotten_failures_can_be_claimed_again() {
    let mut cache = PosterCache::default();
    cache.claim(vec!["a".into(), "b".into()]);
    cache.mark_failed("a".into());
    cache.insert("b".into(), DynamicImage::ImageRgb8(RgbImage::new(8, 8)));
    cache.forget_failed();
    assert_eq!(cache.claim(vec!["a".into(), "b".into()]), ["a"]);
    assert!(cache.image("b").is_some());
  }

  #[test]
  fn clearing_resized_keeps_originals() {
    let mut cache = PosterCache::default();
    cache.insert("a".into(), DynamicImage::ImageRgb8(RgbImage::new(20, 30)));
    cache.resized("a", 4, 6);
    cache.resized("a", 8, 12);
    assert_eq!(cache.resized.len(), 2);
    cache.clear_resized();
    assert!(cache.resized.is_empty());
    assert!(cache.image("a").is_some());
  }
}
