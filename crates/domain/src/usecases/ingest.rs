//! Ingest use case - runs every news source and upserts what it finds

use std::sync::Arc;

use crate::{
    model::{IngestSummary, NewsCandidate, SourceReport},
    ports::{Clock, NewsSource, NewsStore},
};

/// Ingestion orchestrator
pub struct IngestUseCase<St, Cl>
where
    St: NewsStore + ?Sized,
    Cl: Clock + ?Sized,
{
    sources: Vec<Arc<dyn NewsSource>>,
    store: Arc<St>,
    clock: Arc<Cl>,
}

impl<St, Cl> IngestUseCase<St, Cl>
where
    St: NewsStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(sources: Vec<Arc<dyn NewsSource>>, store: Arc<St>, clock: Arc<Cl>) -> Self {
        Self {
            sources,
            store,
            clock,
        }
    }

    /// Run all sources in order.
    ///
    /// A failing source is reported and contributes nothing; the rest still run.
    /// Sources run one after another so same-url writes land in scrape order.
    pub async fn run(&self) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for source in &self.sources {
            let report = self.ingest_source(source.as_ref()).await;
            match &report.error {
                Some(error) => tracing::error!(
                    source = %report.source,
                    upserted = report.upserted,
                    error = %error,
                    "Source ingestion failed"
                ),
                None => tracing::info!(
                    source = %report.source,
                    fetched = report.fetched,
                    upserted = report.upserted,
                    "Source ingested"
                ),
            }
            summary.sources.push(report);
        }

        summary
    }

    async fn ingest_source(&self, source: &dyn NewsSource) -> SourceReport {
        let mut report = SourceReport {
            source: source.name().to_string(),
            fetched: 0,
            upserted: 0,
            error: None,
        };

        tracing::info!(source = source.name(), "Scraping source");

        let candidates = match source.fetch().await {
            Ok(candidates) => candidates,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };

        report.fetched = candidates.len();
        if candidates.is_empty() {
            tracing::info!(source = source.name(), "No items found to scrape");
            return report;
        }

        for candidate in candidates {
            if let Err(e) = candidate.validate() {
                tracing::warn!(source = source.name(), error = %e, "Dropping invalid candidate");
                continue;
            }

            if let Err(e) = self.upsert(candidate).await {
                report.error = Some(e);
                return report;
            }
            report.upserted += 1;
        }

        report
    }

    async fn upsert(&self, candidate: NewsCandidate) -> Result<(), String> {
        let item = candidate.into_item(self.clock.now());
        self.store
            .upsert_item(&item)
            .await
            .map_err(|e| format!("Failed to upsert {}: {}", item.url, e))?;

        tracing::debug!(title = %item.title, url = %item.url, "Upserted item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, NewsItem};
    use crate::ports::{SourceError, StoreError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    struct FakeSource {
        name: &'static str,
        result: Result<Vec<NewsCandidate>, String>,
    }

    #[async_trait]
    impl NewsSource for FakeSource {
        async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError> {
            self.result.clone().map_err(SourceError::Network)
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[derive(Default)]
    struct FakeStore {
        items: Mutex<HashMap<String, NewsItem>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl NewsStore for FakeStore {
        async fn upsert_item(&self, item: &NewsItem) -> Result<(), StoreError> {
            if self.fail_on.as_deref() == Some(item.url.as_str()) {
                return Err(StoreError::Database("disk full".to_string()));
            }
            self.items
                .lock()
                .unwrap()
                .insert(item.url.clone(), item.clone());
            Ok(())
        }

        async fn items_since(&self, since: OffsetDateTime) -> Result<Vec<NewsItem>, StoreError> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .values()
                .filter(|i| i.scraped_at >= since)
                .cloned()
                .collect())
        }
    }

    struct FakeClock {
        time: OffsetDateTime,
    }

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            self.time
        }
    }

    fn clock() -> Arc<FakeClock> {
        Arc::new(FakeClock {
            time: OffsetDateTime::from_unix_timestamp(1_760_601_600).unwrap(),
        })
    }

    fn source(name: &'static str, candidates: Vec<NewsCandidate>) -> Arc<dyn NewsSource> {
        Arc::new(FakeSource {
            name,
            result: Ok(candidates),
        })
    }

    fn failing_source(name: &'static str) -> Arc<dyn NewsSource> {
        Arc::new(FakeSource {
            name,
            result: Err("connection refused".to_string()),
        })
    }

    #[tokio::test]
    async fn test_failing_source_is_contained() {
        let store = Arc::new(FakeStore::default());
        let usecase = IngestUseCase::new(
            vec![
                failing_source("immigration"),
                source(
                    "tech",
                    vec![NewsCandidate::new(
                        Category::Tech,
                        "Headline",
                        "https://example.com/a",
                    )],
                ),
            ],
            Arc::clone(&store),
            clock(),
        );

        let summary = usecase.run().await;

        assert_eq!(summary.sources.len(), 2);
        assert!(
            summary.sources[0]
                .error
                .as_deref()
                .unwrap()
                .contains("connection refused")
        );
        assert_eq!(summary.sources[1].upserted, 1);
        assert_eq!(summary.total_upserted(), 1);
        assert_eq!(summary.failed_sources().count(), 1);
        assert_eq!(store.items.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_items_are_stamped_by_clock() {
        let store = Arc::new(FakeStore::default());
        let usecase = IngestUseCase::new(
            vec![source(
                "finance",
                vec![
                    NewsCandidate::new(Category::Finance, "GBP to USD: 1.3400", "https://xe.com")
                        .with_summary("1 GBP = 1.3400 USD"),
                ],
            )],
            Arc::clone(&store),
            clock(),
        );

        usecase.run().await;

        let items = store.items.lock().unwrap();
        let stored = items.get("https://xe.com").unwrap();
        assert_eq!(stored.scraped_at.unix_timestamp(), 1_760_601_600);
        assert_eq!(stored.summary.as_deref(), Some("1 GBP = 1.3400 USD"));
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate_and_keeps_latest() {
        let store = Arc::new(FakeStore::default());

        let first = IngestUseCase::new(
            vec![source(
                "finance",
                vec![NewsCandidate::new(
                    Category::Finance,
                    "GBP to USD: 1.3400",
                    "https://xe.com",
                )],
            )],
            Arc::clone(&store),
            clock(),
        );
        first.run().await;

        let second = IngestUseCase::new(
            vec![source(
                "finance",
                vec![NewsCandidate::new(
                    Category::Finance,
                    "GBP to USD: 1.3500",
                    "https://xe.com",
                )],
            )],
            Arc::clone(&store),
            clock(),
        );
        second.run().await;

        let items = store.items.lock().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items["https://xe.com"].title, "GBP to USD: 1.3500");
    }

    #[tokio::test]
    async fn test_invalid_candidates_are_dropped() {
        let store = Arc::new(FakeStore::default());
        let usecase = IngestUseCase::new(
            vec![source(
                "tech",
                vec![
                    NewsCandidate::new(Category::Tech, "No link", ""),
                    NewsCandidate::new(Category::Tech, "", "https://example.com/untitled"),
                    NewsCandidate::new(Category::Tech, "Good", "https://example.com/good"),
                ],
            )],
            Arc::clone(&store),
            clock(),
        );

        let summary = usecase.run().await;

        assert_eq!(summary.sources[0].fetched, 3);
        assert_eq!(summary.sources[0].upserted, 1);
        assert!(summary.sources[0].error.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_stops_only_that_source() {
        let store = Arc::new(FakeStore {
            fail_on: Some("https://example.com/bad".to_string()),
            ..Default::default()
        });
        let usecase = IngestUseCase::new(
            vec![
                source(
                    "tech",
                    vec![
                        NewsCandidate::new(Category::Tech, "Bad", "https://example.com/bad"),
                        NewsCandidate::new(Category::Tech, "Never", "https://example.com/never"),
                    ],
                ),
                source(
                    "finance",
                    vec![NewsCandidate::new(
                        Category::Finance,
                        "Rate",
                        "https://example.com/rate",
                    )],
                ),
            ],
            Arc::clone(&store),
            clock(),
        );

        let summary = usecase.run().await;

        assert_eq!(summary.sources[0].upserted, 0);
        assert!(
            summary.sources[0]
                .error
                .as_deref()
                .unwrap()
                .contains("disk full")
        );
        assert_eq!(summary.sources[1].upserted, 1);
        assert!(!store.items.lock().unwrap().contains_key("https://example.com/never"));
    }

    #[tokio::test]
    async fn test_later_source_wins_for_shared_url() {
        let store = Arc::new(FakeStore::default());
        let usecase = IngestUseCase::new(
            vec![
                source(
                    "first",
                    vec![NewsCandidate::new(Category::Tech, "First", "https://example.com/x")],
                ),
                source(
                    "second",
                    vec![NewsCandidate::new(Category::Tech, "Second", "https://example.com/x")],
                ),
            ],
            Arc::clone(&store),
            clock(),
        );

        usecase.run().await;

        let items = store.items.lock().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items["https://example.com/x"].title, "Second");
    }
}
