//! GOV.UK immigration rules guidance page scraper

use super::{build_client, clean_text, fetch_body};
use alfred_brief_domain::{Category, NewsCandidate, NewsSource, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

pub const DEFAULT_PAGE_URL: &str = "https://www.gov.uk/guidance/immigration-rules";

const LATEST_UPDATE_TITLE: &str = "Immigration Rules - Latest Update";
const HISTORY_TITLE: &str = "Immigration Rules - Full Update History";
const HISTORY_SUMMARY: &str = "View the complete history of changes to immigration rules.";

/// Scrapes the "last updated" date, update history link and contents sections
pub struct GovUkGuidanceSource {
    client: Client,
    page_url: String,
    max_sections: usize,
}

impl GovUkGuidanceSource {
    pub fn new(page_url: impl Into<String>, timeout: Duration, max_sections: usize) -> Self {
        Self {
            client: build_client(timeout),
            page_url: page_url.into(),
            max_sections,
        }
    }
}

impl Default for GovUkGuidanceSource {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_URL, super::DEFAULT_TIMEOUT, 5)
    }
}

#[async_trait]
impl NewsSource for GovUkGuidanceSource {
    async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError> {
        let page_url = Url::parse(&self.page_url)
            .map_err(|e| SourceError::Parse(format!("invalid page url {}: {}", self.page_url, e)))?;

        let html = fetch_body(&self.client, page_url.as_str()).await?;
        parse_guidance_page(&html, &page_url, self.max_sections)
    }

    fn name(&self) -> &'static str {
        "gov_uk_immigration"
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("bad selector {}: {}", css, e)))
}

/// Extract candidates from a guidance page.
///
/// Elements that are missing are skipped; a page with none of them yields
/// an empty list.
pub fn parse_guidance_page(
    html: &str,
    page_url: &Url,
    max_sections: usize,
) -> Result<Vec<NewsCandidate>, SourceError> {
    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    let last_updated = selector("div.gem-c-metadata dd.gem-c-metadata__definition")?;
    if let Some(element) = document.select(&last_updated).next() {
        // first text node holds the date; trailing links like "See all updates" are dropped
        let date = element
            .text()
            .map(|t| clean_text(t).trim_end_matches(['—', '-', ' ']).to_string())
            .find(|t| !t.is_empty());
        if let Some(date) = date {
            candidates.push(
                NewsCandidate::new(Category::Immigration, LATEST_UPDATE_TITLE, page_url.as_str())
                    .with_summary(format!("Last updated: {}", date)),
            );
        }
    }

    let history = selector(r#"a[href*="full-publication-update-history"]"#)?;
    if let Some(href) = document
        .select(&history)
        .next()
        .and_then(|a| a.value().attr("href"))
    {
        match page_url.join(href) {
            Ok(url) => candidates.push(
                NewsCandidate::new(Category::Immigration, HISTORY_TITLE, url.as_str())
                    .with_summary(HISTORY_SUMMARY),
            ),
            Err(e) => tracing::warn!(href, error = %e, "Skipping unresolvable history link"),
        }
    }

    let contents = selector("a.gem-c-contents-list__link")?;
    for link in document.select(&contents).take(max_sections) {
        let text = clean_text(&link.text().collect::<String>());
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if text.is_empty() || href.trim().is_empty() {
            continue;
        }

        match page_url.join(href) {
            Ok(url) => candidates.push(NewsCandidate::new(
                Category::Immigration,
                format!("Immigration Rules: {}", text),
                url.as_str(),
            )),
            Err(e) => tracing::warn!(href, error = %e, "Skipping unresolvable section link"),
        }
    }

    Ok(candidates)
}
