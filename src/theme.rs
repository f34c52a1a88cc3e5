use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  /// Background of the name strip under each poster.
  pub caption_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Marine",
    bg: Color::Rgb(18, 22, 30),
    fg: Color::Rgb(222, 228, 238),
    accent: Color::Rgb(0, 123, 255),
    muted: Color::Rgb(120, 130, 148),
    border: Color::Rgb(52, 60, 76),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(0, 90, 190),
    caption_bg: Color::Rgb(30, 34, 42),
    status: Color::Rgb(130, 200, 255),
    error: Color::Rgb(255, 120, 120),
    key_fg: Color::Rgb(18, 22, 30),
    key_bg: Color::Rgb(0, 123, 255),
  },
  Theme {
    name: "Dusk",
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(203, 166, 247),
    muted: Color::Rgb(127, 132, 156),
    border: Color::Rgb(69, 71, 90),
    highlight_fg: Color::Rgb(30, 30, 46),
    highlight_bg: Color::Rgb(203, 166, 247),
    caption_bg: Color::Rgb(49, 50, 68),
    status: Color::Rgb(137, 220, 235),
    error: Color::Rgb(243, 139, 168),
    key_fg: Color::Rgb(30, 30, 46),
    key_bg: Color::Rgb(203, 166, 247),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 40),
    accent: Color::Rgb(200, 80, 40),
    muted: Color::Rgb(140, 136, 128),
    border: Color::Rgb(210, 204, 192),
    highlight_fg: Color::Rgb(250, 248, 242),
    highlight_bg: Color::Rgb(200, 80, 40),
    caption_bg: Color::Rgb(232, 228, 218),
    status: Color::Rgb(40, 110, 160),
    error: Color::Rgb(190, 40, 40),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(90, 90, 90),
  },
];

/// Index of the theme called `name`, or the first theme.
pub fn index_of(name: &str) -> usize {
  THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(name)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn index_of_known_and_unknown() {
    assert_eq!(index_of("dusk"), 1);
    assert_eq!(index_of("Paper"), 2);
    assert_eq!(index_of("neon"), 0);
  }
}
