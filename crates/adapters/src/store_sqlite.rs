//! SQLite store implementation

use alfred_brief_domain::{
    Category, NewsItem, NewsStore, Preferences, Store, StoreError, Subscriber, SubscriberStore,
};
use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;

type SubscriberRow = (String, Option<String>, String, bool, Option<String>);

/// SQLite-backed store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        // scraped_at is unix milliseconds so range filters compare numerically
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_items (
                url TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                summary TEXT,
                scraped_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_news_items_scraped_at
            ON news_items(scraped_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE,
                preferences_json TEXT NOT NULL DEFAULT '{}',
                active INTEGER NOT NULL DEFAULT 1,
                management_token TEXT UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn fetch_subscribers(&self, only_active: bool) -> Result<Vec<Subscriber>, StoreError> {
        let sql = if only_active {
            "SELECT id, email, preferences_json, active, management_token FROM subscribers WHERE active = 1"
        } else {
            "SELECT id, email, preferences_json, active, management_token FROM subscribers ORDER BY email"
        };

        let rows: Vec<SubscriberRow> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(subscriber_from_row).collect())
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn to_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(ms: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn subscriber_from_row(row: SubscriberRow) -> Subscriber {
    let (id, email, preferences_json, active, management_token) = row;

    let preferences = match serde_json::from_str::<serde_json::Value>(&preferences_json) {
        Ok(value) => Preferences::from_json(&value),
        Err(e) => {
            tracing::warn!(subscriber_id = %id, error = %e, "Unreadable preferences, treating as empty");
            Preferences::new()
        }
    };

    Subscriber {
        id,
        email,
        preferences,
        active,
        management_token,
    }
}

#[async_trait]
impl NewsStore for SqliteStore {
    async fn upsert_item(&self, item: &NewsItem) -> Result<(), StoreError> {
        if item.url.trim().is_empty() {
            return Err(StoreError::Validation(
                "news item url must not be empty".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO news_items (url, category, title, summary, scraped_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                category = excluded.category,
                title = excluded.title,
                summary = excluded.summary,
                scraped_at = excluded.scraped_at
            "#,
        )
        .bind(&item.url)
        .bind(item.category.as_str())
        .bind(&item.title)
        .bind(&item.summary)
        .bind(to_millis(item.scraped_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn items_since(&self, since: OffsetDateTime) -> Result<Vec<NewsItem>, StoreError> {
        let rows: Vec<(String, String, String, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT url, category, title, summary, scraped_at
            FROM news_items
            WHERE scraped_at >= ?
            ORDER BY scraped_at DESC
            "#,
        )
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut items = Vec::with_capacity(rows.len());
        for (url, category, title, summary, scraped_at) in rows {
            let category = match category.parse::<Category>() {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Dropping stored item");
                    continue;
                }
            };

            items.push(NewsItem {
                category,
                title,
                url,
                summary,
                scraped_at: from_millis(scraped_at)?,
            });
        }

        Ok(items)
    }
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.fetch_subscribers(true).await
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.fetch_subscribers(false).await
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<bool, StoreError> {
        let preferences_json = serde_json::to_string(&subscriber.preferences)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (id, email, preferences_json, active, management_token)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&subscriber.id)
        .bind(&subscriber.email)
        .bind(&preferences_json)
        .bind(subscriber.active)
        .bind(&subscriber.management_token)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_preferences(
        &self,
        token: &str,
        preferences: &Preferences,
    ) -> Result<bool, StoreError> {
        let preferences_json = serde_json::to_string(preferences)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result =
            sqlx::query("UPDATE subscribers SET preferences_json = ? WHERE management_token = ?")
                .bind(&preferences_json)
                .bind(token)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, token: &str, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE subscribers SET active = ? WHERE management_token = ?")
            .bind(active)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_brief_domain::{
        Clock, NewsCandidate, NewsSource, SourceError, period_start, usecases::IngestUseCase,
    };
    use std::sync::Arc;

    const DAY_START: i64 = 1_760_572_800; // 2025-10-16T00:00:00Z

    fn at(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).unwrap()
    }

    fn item(url: &str, title: &str, scraped_at: OffsetDateTime) -> NewsItem {
        NewsItem {
            category: Category::Tech,
            title: title.to_string(),
            url: url.to_string(),
            summary: Some("summary".to_string()),
            scraped_at,
        }
    }

    fn subscriber(id: &str, email: &str, active: bool) -> Subscriber {
        Subscriber {
            id: id.to_string(),
            email: Some(email.to_string()),
            preferences: Preferences::from_categories([Category::Tech]),
            active,
            management_token: Some(format!("token-{}", id)),
        }
    }

    #[tokio::test]
    async fn test_upsert_same_url_keeps_latest() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .upsert_item(&item("https://example.com/a", "First", at(DAY_START + 10)))
            .await
            .unwrap();
        store
            .upsert_item(&item("https://example.com/a", "Second", at(DAY_START + 20)))
            .await
            .unwrap();

        let items = store.items_since(at(DAY_START)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Second");
        assert_eq!(items[0].scraped_at, at(DAY_START + 20));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let record = item("https://example.com/a", "Same", at(DAY_START + 10));

        store.upsert_item(&record).await.unwrap();
        store.upsert_item(&record).await.unwrap();

        let items = store.items_since(at(DAY_START)).await.unwrap();
        assert_eq!(items, vec![record]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_url() {
        let store = SqliteStore::in_memory().await.unwrap();

        let result = store.upsert_item(&item("", "No url", at(DAY_START))).await;

        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_items_since_is_inclusive_and_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .upsert_item(&item("https://example.com/old", "Old", at(DAY_START - 1)))
            .await
            .unwrap();
        store
            .upsert_item(&item("https://example.com/edge", "Edge", at(DAY_START)))
            .await
            .unwrap();
        store
            .upsert_item(&item("https://example.com/new", "New", at(DAY_START + 3600)))
            .await
            .unwrap();

        let items = store.items_since(at(DAY_START)).await.unwrap();
        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/new", "https://example.com/edge"]);
    }

    struct StaticSource {
        name: &'static str,
        candidates: Vec<NewsCandidate>,
    }

    #[async_trait]
    impl NewsSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError> {
            Ok(self.candidates.clone())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[tokio::test]
    async fn test_ingested_items_are_visible_for_the_period() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        // Fractional seconds close to midnight must still compare correctly
        let clock = Arc::new(FixedClock(at(DAY_START) + time::Duration::milliseconds(250)));
        let sources: Vec<Arc<dyn NewsSource>> = vec![
            Arc::new(StaticSource {
                name: "immigration",
                candidates: vec![
                    NewsCandidate::new(
                        Category::Immigration,
                        "Immigration Rules - Latest Update",
                        "https://www.gov.uk/guidance/immigration-rules",
                    )
                    .with_summary("Last updated: 10 October 2025"),
                ],
            }),
            Arc::new(StaticSource {
                name: "tech",
                candidates: vec![
                    NewsCandidate::new(Category::Tech, "Chips", "https://example.com/chips"),
                    NewsCandidate::new(Category::Tech, "Robots", "https://example.com/robots"),
                ],
            }),
            Arc::new(StaticSource {
                name: "finance",
                candidates: vec![NewsCandidate::new(
                    Category::Finance,
                    "GBP to USD: 1.3400",
                    "https://www.xe.com/currencyconverter/convert/?From=GBP&To=USD",
                )],
            }),
        ];

        let summary = IngestUseCase::new(sources, Arc::clone(&store), Arc::clone(&clock))
            .run()
            .await;
        assert_eq!(summary.total_upserted(), 4);

        let items = store.items_since(period_start(clock.now())).await.unwrap();

        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| i.scraped_at == clock.now()));
        let mut urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        urls.sort_unstable();
        assert_eq!(
            urls,
            vec![
                "https://example.com/chips",
                "https://example.com/robots",
                "https://www.gov.uk/guidance/immigration-rules",
                "https://www.xe.com/currencyconverter/convert/?From=GBP&To=USD",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_category_rows_are_dropped() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO news_items (url, category, title, summary, scraped_at) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind("https://example.com/sport")
        .bind("sport")
        .bind("Match report")
        .bind(DAY_START * 1000)
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO news_items (url, category, title, summary, scraped_at) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind("https://example.com/tech")
        .bind("Tech")
        .bind("Chip news")
        .bind(DAY_START * 1000)
        .execute(&store.pool)
        .await
        .unwrap();

        let items = store.items_since(at(DAY_START)).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, Category::Tech);
    }

    #[tokio::test]
    async fn test_active_subscribers_filters_inactive() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert!(
            store
                .insert_subscriber(&subscriber("1", "a@example.com", true))
                .await
                .unwrap()
        );
        assert!(
            store
                .insert_subscriber(&subscriber("2", "b@example.com", false))
                .await
                .unwrap()
        );

        let active = store.active_subscribers().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email.as_deref(), Some("a@example.com"));
        assert!(active[0].preferences.is_enabled(Category::Tech));
        assert!(!active[0].preferences.is_enabled(Category::Finance));

        assert_eq!(store.list_subscribers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_duplicate_email_is_ignored() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .insert_subscriber(&subscriber("1", "a@example.com", true))
            .await
            .unwrap();
        let inserted = store
            .insert_subscriber(&subscriber("2", "a@example.com", true))
            .await
            .unwrap();

        assert!(!inserted);
        let all = store.list_subscribers().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "1");
    }

    #[tokio::test]
    async fn test_token_updates() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_subscriber(&subscriber("1", "a@example.com", true))
            .await
            .unwrap();

        let updated = store
            .set_preferences("token-1", &Preferences::from_categories([Category::Finance]))
            .await
            .unwrap();
        assert!(updated);
        assert!(
            !store
                .set_preferences("missing", &Preferences::new())
                .await
                .unwrap()
        );

        let active = store.active_subscribers().await.unwrap();
        assert!(active[0].preferences.is_enabled(Category::Finance));
        assert!(!active[0].preferences.is_enabled(Category::Tech));

        assert!(store.set_active("token-1", false).await.unwrap());
        assert!(store.active_subscribers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truthy_preferences_from_raw_rows() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO subscribers (id, email, preferences_json, active, management_token) VALUES ('1', 'a@example.com', ?, 1, NULL)",
        )
        .bind(r#"{"immigration": 1, "tech": null}"#)
        .execute(&store.pool)
        .await
        .unwrap();

        let active = store.active_subscribers().await.unwrap();

        assert!(active[0].preferences.is_enabled(Category::Immigration));
        assert!(!active[0].preferences.is_enabled(Category::Tech));
        assert!(active[0].management_token.is_none());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("brief.sqlite");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.ping().await.unwrap();
            store
                .upsert_item(&item("https://example.com/a", "Kept", at(DAY_START)))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::new(&path).await.unwrap();
        let items = reopened.items_since(at(DAY_START)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(reopened.backend(), "sqlite");
    }
}
