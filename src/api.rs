use anyhow::{Context, Result};
use image::DynamicImage;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::constants::constants;

/// A single poster record from a content page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
  #[serde(default)]
  pub id: String,
  #[serde(rename = "poster-image", default)]
  pub poster_image: String,
  #[serde(default)]
  pub name: String,
}

impl ContentItem {
  /// Name shown under the poster; blank names read as "No Name".
  pub fn display_name(&self) -> &str {
    if self.name.trim().is_empty() { "No Name" } else { &self.name }
  }
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
  page: PageBody,
}

#[derive(Debug, Deserialize)]
struct PageBody {
  #[serde(default)]
  title: Option<String>,
  #[serde(rename = "total-content-items", default)]
  total_content_items: Option<String>,
  #[serde(rename = "content-items", default)]
  content_items: Option<ContentItems>,
}

#[derive(Debug, Deserialize)]
struct ContentItems {
  #[serde(default)]
  content: Option<Vec<ContentItem>>,
}

/// Outcome of requesting one content page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResponse {
  /// The server answered with a non-success status.
  Status(u16),
  /// The page parsed; an empty vec means the feed is exhausted.
  Items(Vec<ContentItem>),
}

/// Parse a page body into its item list. A missing list reads as empty.
pub fn parse_page(body: &str) -> Result<Vec<ContentItem>> {
  let envelope: PageEnvelope = serde_json::from_str(body).context("Failed to parse content page JSON")?;
  if let Some(title) = &envelope.page.title {
    debug!(title = %title, total = ?envelope.page.total_content_items, "content page parsed");
  }
  Ok(envelope.page.content_items.and_then(|c| c.content).unwrap_or_default())
}

/// Upstream source of content pages.
pub trait PageSource: Send + Sync {
  /// Request page `page` (1-based).
  ///
  /// Transport and decode failures are `Err`; a non-success status is
  /// reported as `Ok(PageResponse::Status)`.
  fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageResponse>> + Send;
}

/// URL layout of the content host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
  base: String,
}

impl Endpoint {
  pub fn new(base: &str) -> Self {
    Self { base: base.trim_end_matches('/').to_string() }
  }

  pub fn base(&self) -> &str {
    &self.base
  }

  pub fn page_url(&self, page: u32) -> String {
    format!("{}/data/page{}.json", self.base, page)
  }

  pub fn image_url(&self, poster: &str) -> String {
    format!("{}/images/{}", self.base, poster)
  }

  pub fn placeholder_url(&self) -> String {
    self.image_url(&constants().placeholder_image)
  }

  /// Real image URL for an item, or the placeholder when it has no poster.
  pub fn poster_url(&self, item: &ContentItem) -> String {
    if item.poster_image.trim().is_empty() { self.placeholder_url() } else { self.image_url(&item.poster_image) }
  }
}

impl Default for Endpoint {
  fn default() -> Self {
    Self::new(&constants().base_url)
  }
}

/// HTTP client for the content host.
#[derive(Debug, Clone)]
pub struct HttpSource {
  client: Client,
  endpoint: Endpoint,
}

impl HttpSource {
  pub fn new(endpoint: Endpoint) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(concat!("posters/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { client, endpoint })
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }
}

impl PageSource for HttpSource {
  fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageResponse>> + Send {
    let client = self.client.clone();
    let url = self.endpoint.page_url(page);
    async move {
      let response = client.get(&url).send().await.with_context(|| format!("Failed to request {}", url))?;
      let status = response.status();
      if !status.is_success() {
        return Ok(PageResponse::Status(status.as_u16()));
      }
      let body = response.text().await.with_context(|| format!("Failed to read body of {}", url))?;
      Ok(PageResponse::Items(parse_page(&body)?))
    }
  }
}

/// Download and decode one poster image.
pub async fn fetch_poster(client: &Client, url: &str) -> Result<DynamicImage> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to request poster {}", url))?;
  let status = response.status();
  if status != StatusCode::OK {
    anyhow::bail!("Poster request {} returned {}", url, status);
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read poster bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode poster (URL: {})", url))
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "page": {
      "title": "Romantic Comedy",
      "total-content-items": "54",
      "page-num": "1",
      "page-size": "20",
      "content-items": {
        "content": [
          { "name": "The Birds", "poster-image": "poster1.jpg" },
          { "id": "2", "name": "Rear Window", "poster-image": "poster2.jpg" }
        ]
      }
    }
  }"#;

  #[test]
  fn parse_page_extracts_items_in_order() {
    let items = parse_page(SAMPLE).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "The Birds");
    assert_eq!(items[0].id, "");
    assert_eq!(items[1].poster_image, "poster2.jpg");
  }

  #[test]
  fn parse_page_missing_content_is_empty() {
    let items = parse_page(r#"{ "page": { "content-items": {} } }"#).unwrap();
    assert!(items.is_empty());
    let items = parse_page(r#"{ "page": {} }"#).unwrap();
    assert!(items.is_empty());
  }

  #[test]
  fn parse_page_rejects_garbage() {
    assert!(parse_page("<html>").is_err());
    assert!(parse_page(r#"{ "data": [] }"#).is_err());
  }

  #[test]
  fn endpoint_urls() {
    let ep = Endpoint::new("https://example.com/");
    assert_eq!(ep.page_url(3), "https://example.com/data/page3.json");
    assert_eq!(ep.image_url("a.jpg"), "https://example.com/images/a.jpg");
    assert_eq!(ep.placeholder_url(), "https://example.com/images/placeholder_for_missing_posters.png");
  }

  #[test]
  fn poster_url_falls_back_to_placeholder() {
    let ep = Endpoint::new("https://example.com");
    let item = ContentItem { id: "1".into(), poster_image: "".into(), name: "x".into() };
    assert_eq!(ep.poster_url(&item), ep.placeholder_url());
    let item = ContentItem { poster_image: "p.jpg".into(), ..item };
    assert_eq!(ep.poster_url(&item), "https://example.com/images/p.jpg");
  }

  #[test]
  fn display_name_defaults() {
    let item = ContentItem { id: "1".into(), poster_image: "p.jpg".into(), name: "  ".into() };
    assert_eq!(item.display_name(), "No Name");
  }
}
