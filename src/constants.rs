//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file
//! I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Host serving `data/page{N}.json` and `images/...`.
  pub base_url: String,
  /// File name of the stand-in poster under `images/`.
  pub placeholder_image: String,

  // Grid
  pub display_page_size: usize,
  pub grid_columns: usize,
  /// Terminal lines per poster cell (image plus name row).
  pub cell_height: u16,
  /// Fetch when `scroll_height - scroll_top <= client_height * ratio`.
  pub scroll_trigger_ratio: f64,

  // Network
  pub request_timeout_secs: u64,
  pub poster_concurrency: usize,

  // UI
  pub error_dismiss_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails the first test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
