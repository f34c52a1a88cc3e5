use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use std::io::{Cursor, Write};

use crate::display::DisplayMode;

// --- Poster Widget ---

/// Draws an already-resized poster into a grid cell.
///
/// Kitty posters are drawn out-of-band after the frame, so the widget only
/// renders the character-cell modes.
pub struct PosterWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

impl Widget for PosterWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    let area = area.intersection(*buf.area());
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => render_half_blocks(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
      DisplayMode::Kitty => {}
    }
  }
}

/// Offset that centers `len` within `avail`, as a cell coordinate.
fn centered(origin: u16, avail: u16, len: u32) -> u16 {
  let pad = u32::from(avail).saturating_sub(len) / 2;
  origin.saturating_add(pad.min(u32::from(u16::MAX)) as u16)
}

fn render_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let img_w = rgb.width().min(u32::from(area.width));
  let img_h = rgb.height();
  let rows = img_h.div_ceil(2).min(u32::from(area.height));
  let x0 = centered(area.x, area.width, img_w);
  let y0 = centered(area.y, area.height, rows);

  for y in 0..rows {
    for x in 0..img_w {
      let upper = rgb.get_pixel(x, y * 2);
      let lower_y = y * 2 + 1;
      let fg = Color::Rgb(upper[0], upper[1], upper[2]);
      let bg = if lower_y < img_h {
        let lower = rgb.get_pixel(x, lower_y);
        Color::Rgb(lower[0], lower[1], lower[2])
      } else {
        Color::Reset
      };
      buf.set_string(x0 + x as u16, y0 + y as u16, "▀", Style::default().fg(fg).bg(bg));
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let img_w = luma.width().min(u32::from(area.width));
  let img_h = luma.height().min(u32::from(area.height));
  let x0 = centered(area.x, area.width, img_w);
  let y0 = centered(area.y, area.height, img_h);

  for y in 0..img_h {
    for x in 0..img_w {
      let glyph = ascii_glyph(luma.get_pixel(x, y)[0]);
      buf.set_string(x0 + x as u16, y0 + y as u16, glyph, Style::default());
    }
  }
}

fn ascii_glyph(level: u8) -> &'static str {
  let idx = ((f32::from(level) / 255.0) * (ASCII_RAMP.len() - 1) as f32).round() as usize;
  ASCII_RAMP[idx.min(ASCII_RAMP.len() - 1)]
}

// --- Kitty Graphics Protocol ---
//
//   Transmit:  \x1B_G a=T,f=100,t=d,i=<id>,p=1,c=<cols>,r=<rows>,C=1,q=2,m=1;<base64 chunk>\x1B\\
//   Continue:  \x1B_G m=1;<base64 chunk>\x1B\\
//   Last:      \x1B_G m=0;<base64 chunk>\x1B\\
//   Delete all:       \x1B_G a=d,d=a,q=2\x1B\\
//
// Each visible poster gets its own image id so a frame can place a whole
// grid. `C=1` keeps the cursor still between placements.

const KITTY_CHUNK_SIZE: usize = 4096;

/// Delete every Kitty image on screen (before re-placing a grid and on exit).
pub fn kitty_delete_all(out: &mut impl Write) -> Result<()> {
  write!(out, "\x1B_Ga=d,d=a,q=2\x1B\\").context("Failed to write kitty delete all")?;
  out.flush().context("Failed to flush kitty delete")?;
  Ok(())
}

/// Build the escape sequence that places `image` over `area` with id `id`.
pub fn kitty_sequence(image: &DynamicImage, area: Rect, id: u32) -> Result<String> {
  let mut png = Vec::new();
  image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).context("Failed to encode poster as PNG for kitty")?;

  let b64 = BASE64.encode(&png);
  let chunks: Vec<&[u8]> = b64.as_bytes().chunks(KITTY_CHUNK_SIZE).collect();
  let last = chunks.len().saturating_sub(1);

  let mut seq = format!("\x1B[{};{}H", area.y.saturating_add(1), area.x.saturating_add(1));
  for (i, chunk) in chunks.iter().enumerate() {
    let data = std::str::from_utf8(chunk).context("base64 chunk was not valid UTF-8")?;
    let more = u8::from(i < last);
    if i == 0 {
      seq.push_str(&format!(
        "\x1B_Ga=T,f=100,t=d,i={},p=1,c={},r={},C=1,q=2,m={};{}\x1B\\",
        id, area.width, area.height, more, data
      ));
    } else {
      seq.push_str(&format!("\x1B_Gm={};{}\x1B\\", more, data));
    }
  }
  Ok(seq)
}

/// Place a batch of posters in one write.
pub fn kitty_place_all(out: &mut impl Write, placements: &[(&DynamicImage, Rect)]) -> Result<()> {
  for (n, (image, area)) in placements.iter().enumerate() {
    if area.is_empty() {
      continue;
    }
    let seq = kitty_sequence(image, *area, n as u32 + 1)?;
    out.write_all(seq.as_bytes()).context("Failed to write kitty poster")?;
  }
  out.flush().context("Failed to flush kitty posters")?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn solid(w: u32, h: u32, c: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(c)))
  }

  #[test]
  fn ascii_ramp_ends() {
    assert_eq!(ascii_glyph(0), " ");
    assert_eq!(ascii_glyph(255), "@");
  }

  #[test]
  fn half_blocks_fill_cell_colors() {
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    PosterWidget { image: &solid(4, 4, [200, 10, 10]), display_mode: DisplayMode::Direct }.render(area, &mut buf);
    let cell = &buf[(0, 0)];
    assert_eq!(cell.symbol(), "▀");
    assert_eq!(cell.fg, Color::Rgb(200, 10, 10));
    assert_eq!(cell.bg, Color::Rgb(200, 10, 10));
  }

  #[test]
  fn small_image_is_centered() {
    let area = Rect::new(0, 0, 6, 3);
    let mut buf = Buffer::empty(area);
    PosterWidget { image: &solid(2, 1, [255, 255, 255]), display_mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert_eq!(buf[(2, 1)].symbol(), "@");
    assert_eq!(buf[(0, 0)].symbol(), " ");
  }

  #[test]
  fn poster_is_clipped_to_buffer() {
    let buf_area = Rect::new(0, 0, 4, 3);
    for mode in [DisplayMode::Direct, DisplayMode::Ascii] {
      let mut buf = Buffer::empty(buf_area);
      PosterWidget { image: &solid(4, 20, [255, 255, 255]), display_mode: mode }.render(Rect::new(0, 1, 4, 10), &mut buf);
      assert_ne!(buf[(0, 2)].symbol(), " ");
      assert_eq!(buf[(0, 0)].symbol(), " ");
    }
  }

  #[test]
  fn kitty_widget_draws_nothing() {
    let area = Rect::new(0, 0, 3, 3);
    let mut buf = Buffer::empty(area);
    PosterWidget { image: &solid(3, 3, [1, 2, 3]), display_mode: DisplayMode::Kitty }.render(area, &mut buf);
    assert_eq!(buf, Buffer::empty(area));
  }

  #[test]
  fn kitty_sequence_header() {
    let seq = kitty_sequence(&solid(2, 2, [0, 0, 0]), Rect::new(4, 1, 10, 5), 7).unwrap();
    assert!(seq.starts_with("\x1B[2;5H\x1B_Ga=T,f=100,t=d,i=7,p=1,c=10,r=5,C=1,q=2,m=0;"));
    assert!(seq.ends_with("\x1B\\"));
  }

  #[test]
  fn kitty_delete_writes_sequence() {
    let mut out = Vec::new();
    kitty_delete_all(&mut out).unwrap();
    assert_eq!(out, b"\x1B_Ga=d,d=a,q=2\x1B\\");
  }
}
