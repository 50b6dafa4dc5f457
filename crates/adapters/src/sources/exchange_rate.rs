//! GBP/USD exchange rate source

use super::{build_client, fetch_body};
use alfred_brief_domain::{Category, NewsCandidate, NewsSource, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://open.er-api.com/v6/latest/GBP";
pub const DEFAULT_REFERENCE_URL: &str =
    "https://www.xe.com/currencyconverter/convert/?Amount=1&From=GBP&To=USD";

/// Publishes the current GBP to USD rate as a single finance item
pub struct ExchangeRateSource {
    client: Client,
    api_url: String,
    reference_url: String,
}

impl ExchangeRateSource {
    pub fn new(
        api_url: impl Into<String>,
        reference_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_client(timeout),
            api_url: api_url.into(),
            reference_url: reference_url.into(),
        }
    }
}

impl Default for ExchangeRateSource {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_REFERENCE_URL, super::DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[async_trait]
impl NewsSource for ExchangeRateSource {
    async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError> {
        let body = fetch_body(&self.client, &self.api_url).await?;
        let response: RatesResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;

        if response.result != "success" {
            tracing::warn!(result = %response.result, "Exchange rate API did not report success");
            return Ok(Vec::new());
        }

        let Some(rate) = response.rates.get("USD").copied().filter(|r| *r > 0.0) else {
            tracing::warn!("Exchange rate response has no USD rate");
            return Ok(Vec::new());
        };

        let price = format!("{:.4}", rate);
        Ok(vec![
            NewsCandidate::new(
                Category::Finance,
                format!("GBP to USD: {}", price),
                &self.reference_url,
            )
            .with_summary(format!(
                "Current GBP/USD exchange rate: 1 GBP = {} USD",
                price
            )),
        ])
    }

    fn name(&self) -> &'static str {
        "exchange_rate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn source_for(body: serde_json::Value) -> (MockServer, ExchangeRateSource) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/GBP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let source = ExchangeRateSource::new(
            format!("{}/v6/latest/GBP", server.uri()),
            DEFAULT_REFERENCE_URL,
            Duration::from_secs(5),
        );
        (server, source)
    }

    #[tokio::test]
    async fn test_rate_is_formatted_to_four_places() {
        let (_server, source) = source_for(json!({
            "result": "success",
            "base_code": "GBP",
            "rates": {"GBP": 1, "USD": 1.33951, "EUR": 1.15}
        }))
        .await;

        let candidates = source.fetch().await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].category, Category::Finance);
        assert_eq!(candidates[0].title, "GBP to USD: 1.3395");
        assert_eq!(candidates[0].url, DEFAULT_REFERENCE_URL);
        assert_eq!(
            candidates[0].summary.as_deref(),
            Some("Current GBP/USD exchange rate: 1 GBP = 1.3395 USD")
        );
    }

    #[tokio::test]
    async fn test_unsuccessful_result_yields_nothing() {
        let (_server, source) = source_for(json!({
            "result": "error",
            "error-type": "unsupported-code"
        }))
        .await;

        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_usd_yields_nothing() {
        let (_server, source) = source_for(json!({
            "result": "success",
            "rates": {"EUR": 1.15}
        }))
        .await;

        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let source =
            ExchangeRateSource::new(server.uri(), DEFAULT_REFERENCE_URL, Duration::from_secs(5));

        assert!(matches!(
            source.fetch().await,
            Err(SourceError::Parse(_))
        ));
    }
}
