//! BBC technology RSS feed source

use super::{build_client, clean_text, fetch_body};
use alfred_brief_domain::{Category, NewsCandidate, NewsSource, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://feeds.bbci.co.uk/news/technology/rss.xml";

/// Reads the first few entries of an RSS 2.0 feed as tech news
pub struct BbcRssSource {
    client: Client,
    feed_url: String,
    max_items: usize,
}

impl BbcRssSource {
    pub fn new(feed_url: impl Into<String>, timeout: Duration, max_items: usize) -> Self {
        Self {
            client: build_client(timeout),
            feed_url: feed_url.into(),
            max_items,
        }
    }
}

impl Default for BbcRssSource {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL, super::DEFAULT_TIMEOUT, 3)
    }
}

#[async_trait]
impl NewsSource for BbcRssSource {
    async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError> {
        let xml = fetch_body(&self.client, &self.feed_url).await?;
        parse_feed(&xml, self.max_items)
    }

    fn name(&self) -> &'static str {
        "bbc_tech_rss"
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse an RSS document into tech candidates.
///
/// Only the first `limit` entries are considered. Entries without a title or
/// link are skipped, and tracking query strings are removed from links.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<NewsCandidate>, SourceError> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| SourceError::Parse(e.to_string()))?;

    let candidates = rss
        .channel
        .items
        .into_iter()
        .take(limit)
        .filter_map(|item| {
            let title = clean_text(item.title.as_deref().unwrap_or_default());
            let link = item.link.as_deref().unwrap_or_default().trim();
            let link = link.split('?').next().unwrap_or_default();
            if title.is_empty() || link.is_empty() {
                tracing::debug!(title = %title, "Skipping feed entry without title or link");
                return None;
            }

            let candidate = NewsCandidate::new(Category::Tech, title, link);
            let summary = clean_text(item.description.as_deref().unwrap_or_default());
            Some(if summary.is_empty() {
                candidate
            } else {
                candidate.with_summary(summary)
            })
        })
        .collect();

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:atom="http://www.w3.org/2005/Atom" version="2.0">
  <channel>
    <title><![CDATA[BBC News - Technology]]></title>
    <link>https://www.bbc.co.uk/news/technology</link>
    <atom:link href="https://feeds.bbci.co.uk/news/technology/rss.xml" rel="self" type="application/rss+xml"/>
    <item>
      <title><![CDATA[Chipmaker unveils new processor]]></title>
      <description><![CDATA[The firm says the chip is twice as fast.]]></description>
      <link>https://www.bbc.co.uk/news/articles/c1?at_medium=RSS&amp;at_campaign=rss</link>
      <pubDate>Thu, 16 Oct 2025 07:00:00 GMT</pubDate>
    </item>
    <item>
      <title><![CDATA[Untitled link]]></title>
    </item>
    <item>
      <title>Robots learn to fold laundry</title>
      <link>https://www.bbc.co.uk/news/articles/c3</link>
    </item>
    <item>
      <title>Beyond the limit</title>
      <link>https://www.bbc.co.uk/news/articles/c4</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_takes_first_entries() {
        let candidates = parse_feed(FEED, 3).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Chipmaker unveils new processor");
        assert_eq!(candidates[0].url, "https://www.bbc.co.uk/news/articles/c1");
        assert_eq!(
            candidates[0].summary.as_deref(),
            Some("The firm says the chip is twice as fast.")
        );
        assert_eq!(candidates[1].title, "Robots learn to fold laundry");
        assert!(candidates[1].summary.is_none());
        assert!(candidates.iter().all(|c| c.category == Category::Tech));
    }

    #[test]
    fn test_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;

        assert!(parse_feed(xml, 3).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_feed_is_parse_error() {
        let result = parse_feed("<rss><channel><item><title>x</title></channel></rss>", 3);

        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/technology/rss.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let source = BbcRssSource::new(
            format!("{}/news/technology/rss.xml", server.uri()),
            Duration::from_secs(5),
            4,
        );
        let candidates = source.fetch().await.unwrap();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].url, "https://www.bbc.co.uk/news/articles/c4");
    }
}
