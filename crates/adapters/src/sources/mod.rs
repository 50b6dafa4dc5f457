//! News source adapters

mod bbc_rss;
mod exchange_rate;
mod gov_uk;

pub use bbc_rss::{BbcRssSource, parse_feed};
pub use exchange_rate::ExchangeRateSource;
pub use gov_uk::{GovUkGuidanceSource, parse_guidance_page};

use alfred_brief_domain::SourceError;
use reqwest::Client;
use std::time::Duration;

/// Default timeout for outbound source requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("alfred-brief/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}

/// GET a URL and return the body, mapping transport and status failures
pub(crate) async fn fetch_body(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Collapse runs of whitespace the way rendered text reads
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
