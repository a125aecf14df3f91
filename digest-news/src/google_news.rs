//! Google News RSS client for brand queries
//!
//! Fetches the Google News search feed for each configured query.
//! Google News serves RSS 2.0; Atom is accepted as a fallback so the same
//! parser works against mirrors and test fixtures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use digest_core::FeedEntry;

use crate::error::NewsError;
use crate::fetcher::FeedFetcher;

const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Brand queries watched by default
pub fn get_brand_queries() -> Vec<String> {
    vec![
        r#"NextBiomedical OR "Next Biomedical" OR "Nextbiomedical" OR 넥스트바이오메디컬"#
            .to_string(),
        r#"nexpowder OR "Nex Powder" OR 넥스파우더"#.to_string(),
        r#""nexsphere f" OR "Nexsphere-f" OR "Nexsphere F" OR 넥스피어F OR 넥스피어 F"#
            .to_string(),
    ]
}

/// Google News RSS client
pub struct GoogleNewsClient {
    client: Client,
    base_url: String,
}

impl GoogleNewsClient {
    /// Create a new Google News client
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_NEWS_SEARCH_URL)
    }

    /// Create a client against a different search endpoint
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("Mozilla/5.0 (compatible; BrandNewsDigest/1.0)")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search feed URL for a query (English edition, US region)
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&hl=en-US&gl=US&ceid=US:en",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

impl Default for GoogleNewsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedFetcher for GoogleNewsClient {
    async fn fetch(&self, query: &str) -> Result<Vec<FeedEntry>, NewsError> {
        let url = self.search_url(query);
        debug!("Fetching Google News RSS: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(NewsError::ApiError {
                status: response.status().as_u16(),
                message: format!("Google News returned status {}", response.status()),
            });
        }

        let content = response.bytes().await?;
        let entries = parse_feed(&content, query)?;

        info!("Google News returned {} items for '{}'", entries.len(), query);
        Ok(entries)
    }
}

/// Parse a feed body, trying RSS first and then Atom
pub fn parse_feed(content: &[u8], query: &str) -> Result<Vec<FeedEntry>, NewsError> {
    if let Ok(channel) = rss::Channel::read_from(content) {
        return Ok(parse_rss_channel(&channel, query));
    }

    if let Ok(atom_feed) = atom_syndication::Feed::read_from(content) {
        return Ok(parse_atom_feed(&atom_feed, query));
    }

    Err(NewsError::ParseError(format!(
        "Failed to parse feed for query: {}",
        query
    )))
}

/// Convert RSS items into raw entries.
///
/// Items missing a title or link are kept with empty fields; the
/// fingerprinting step treats empty fields as never matching.
fn parse_rss_channel(channel: &rss::Channel, query: &str) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .map(|item| {
            let updated = item
                .dublin_core_ext()
                .and_then(|dc| dc.dates().first())
                .cloned();

            FeedEntry {
                query: query.to_string(),
                title: item.title().unwrap_or_default().trim().to_string(),
                link: item.link().unwrap_or_default().trim().to_string(),
                summary: item.description().unwrap_or_default().to_string(),
                published: item.pub_date().map(str::to_string),
                updated,
            }
        })
        .collect()
}

/// Convert Atom entries into raw entries
fn parse_atom_feed(atom_feed: &atom_syndication::Feed, query: &str) -> Vec<FeedEntry> {
    atom_feed
        .entries()
        .iter()
        .map(|entry| {
            let link = entry
                .links()
                .iter()
                .find(|l| l.rel() == "alternate")
                .or_else(|| entry.links().first())
                .map(|l| l.href().trim().to_string())
                .unwrap_or_default();

            let summary = entry
                .summary()
                .map(|s| s.as_str().to_string())
                .or_else(|| entry.content().and_then(|c| c.value()).map(str::to_string))
                .unwrap_or_default();

            FeedEntry {
                query: query.to_string(),
                title: entry.title().as_str().trim().to_string(),
                link,
                summary,
                published: entry.published().map(|d| d.to_rfc3339()),
                updated: Some(entry.updated().to_rfc3339()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"nexpowder" - Google News</title>
    <link>https://news.google.com</link>
    <description>Google News</description>
    <item>
      <title>Nexpowder cleared for GI bleeding use - MedTech Dive</title>
      <link>https://news.google.com/rss/articles/abc?oc=5</link>
      <pubDate>Tue, 04 Mar 2025 08:30:00 GMT</pubDate>
      <description>&lt;a href="https://example.com"&gt;Nexpowder cleared&lt;/a&gt;</description>
    </item>
    <item>
      <link>https://news.google.com/rss/articles/def</link>
    </item>
  </channel>
</rss>"#;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Mirror</title>
  <id>urn:mirror</id>
  <updated>2025-03-04T09:00:00Z</updated>
  <entry>
    <title>Next Biomedical expands in Europe</title>
    <id>urn:1</id>
    <link rel="alternate" href="https://example.com/nbm"/>
    <updated>2025-03-04T09:00:00Z</updated>
    <summary>&lt;p&gt;Expansion&lt;/p&gt;</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_search_url_encodes_query() {
        let client = GoogleNewsClient::new();
        let url = client.search_url(r#"nexpowder OR "Nex Powder""#);
        assert_eq!(
            url,
            concat!(
                "https://news.google.com/rss/search",
                "?q=nexpowder%20OR%20%22Nex%20Powder%22&hl=en-US&gl=US&ceid=US:en"
            )
        );
    }

    #[test]
    fn test_parse_rss_items() {
        let entries = parse_feed(RSS_FIXTURE.as_bytes(), "nexpowder").unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.query, "nexpowder");
        assert_eq!(first.title, "Nexpowder cleared for GI bleeding use - MedTech Dive");
        assert_eq!(first.link, "https://news.google.com/rss/articles/abc?oc=5");
        assert_eq!(first.published.as_deref(), Some("Tue, 04 Mar 2025 08:30:00 GMT"));
        assert!(first.summary.contains("<a href"));

        // Missing title is kept as empty rather than dropped
        assert_eq!(entries[1].title, "");
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn test_parse_atom_fallback() {
        let entries = parse_feed(ATOM_FIXTURE.as_bytes(), "q").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://example.com/nbm");
        assert_eq!(entries[0].summary, "<p>Expansion</p>");
        assert!(entries[0].published.is_none());
        assert!(entries[0].published_at().is_ok());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let result = parse_feed(b"<html>nope</html>", "q");
        assert!(matches!(result, Err(NewsError::ParseError(_))));
    }

    #[test]
    fn test_brand_queries() {
        let queries = get_brand_queries();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().any(|q| q.contains("nexpowder")));
    }
}
