//! Supabase store adapter speaking the PostgREST API

use alfred_brief_domain::{
    Category, NewsItem, NewsStore, Preferences, Store, StoreError, Subscriber, SubscriberStore,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const SUBSCRIBER_COLUMNS: &str = "id,email,preferences_json,active,management_token";

/// Hosted store backed by Supabase tables `news_items` and `subscribers`
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self::with_timeout(base_url, api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        request
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Database(format!(
                "PostgREST returned {}: {}",
                status, body
            )));
        }

        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        self.execute(request)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn fetch_subscribers(&self, only_active: bool) -> Result<Vec<Subscriber>, StoreError> {
        let mut request = self
            .client
            .get(self.table("subscribers"))
            .query(&[("select", SUBSCRIBER_COLUMNS)]);
        if only_active {
            request = request.query(&[("active", "eq.true")]);
        }

        let rows: Vec<SubscriberRow> = self.fetch_json(request).await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    /// PATCH rows matching a management token; true if any row changed
    async fn patch_by_token(&self, token: &str, body: Value) -> Result<bool, StoreError> {
        let request = self
            .client
            .patch(self.table("subscribers"))
            .query(&[
                ("management_token", format!("eq.{}", token)),
                ("select", "id".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&body);

        let rows: Vec<Value> = self.fetch_json(request).await?;
        Ok(!rows.is_empty())
    }
}

#[derive(Serialize)]
struct NewsItemBody<'a> {
    category: &'a str,
    title: &'a str,
    url: &'a str,
    summary: Option<&'a str>,
    scraped_at: String,
}

#[derive(Deserialize)]
struct NewsItemRow {
    category: String,
    title: String,
    url: String,
    #[serde(default)]
    summary: Option<String>,
    scraped_at: String,
}

#[derive(Deserialize)]
struct SubscriberRow {
    id: Value,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    preferences_json: Value,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    management_token: Option<String>,
}

fn default_active() -> bool {
    true
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        // ids may be bigint or uuid columns
        let id = match row.id {
            Value::String(s) => s,
            other => other.to_string(),
        };

        Subscriber {
            id,
            email: row.email,
            preferences: Preferences::from_json(&row.preferences_json),
            active: row.active,
            management_token: row.management_token,
        }
    }
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String, StoreError> {
    ts.format(&Rfc3339)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl NewsStore for SupabaseStore {
    async fn upsert_item(&self, item: &NewsItem) -> Result<(), StoreError> {
        if item.url.trim().is_empty() {
            return Err(StoreError::Validation(
                "news item url must not be empty".to_string(),
            ));
        }

        let body = NewsItemBody {
            category: item.category.as_str(),
            title: &item.title,
            url: &item.url,
            summary: item.summary.as_deref(),
            scraped_at: format_timestamp(item.scraped_at)?,
        };

        let request = self
            .client
            .post(self.table("news_items"))
            .query(&[("on_conflict", "url")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body);

        self.execute(request).await?;
        Ok(())
    }

    async fn items_since(&self, since: OffsetDateTime) -> Result<Vec<NewsItem>, StoreError> {
        let request = self.client.get(self.table("news_items")).query(&[
            ("select", "*".to_string()),
            ("scraped_at", format!("gte.{}", format_timestamp(since)?)),
            ("order", "scraped_at.desc".to_string()),
        ]);

        let rows: Vec<NewsItemRow> = self.fetch_json(request).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let category = match row.category.parse::<Category>() {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(url = %row.url, error = %e, "Dropping stored item");
                    continue;
                }
            };
            let scraped_at = match OffsetDateTime::parse(&row.scraped_at, &Rfc3339) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(url = %row.url, error = %e, "Dropping item with bad timestamp");
                    continue;
                }
            };

            items.push(NewsItem {
                category,
                title: row.title,
                url: row.url,
                summary: row.summary,
                scraped_at,
            });
        }

        Ok(items)
    }
}

#[async_trait]
impl SubscriberStore for SupabaseStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.fetch_subscribers(true).await
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.fetch_subscribers(false).await
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<bool, StoreError> {
        let body = json!({
            "id": subscriber.id,
            "email": subscriber.email,
            "preferences_json": subscriber.preferences.to_json(),
            "active": subscriber.active,
            "management_token": subscriber.management_token,
        });

        // Ignored duplicates come back as an empty representation
        let request = self
            .client
            .post(self.table("subscribers"))
            .query(&[("on_conflict", "email"), ("select", "id")])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&body);

        let rows: Vec<Value> = self.fetch_json(request).await?;
        Ok(!rows.is_empty())
    }

    async fn set_preferences(
        &self,
        token: &str,
        preferences: &Preferences,
    ) -> Result<bool, StoreError> {
        self.patch_by_token(token, json!({ "preferences_json": preferences.to_json() }))
            .await
    }

    async fn set_active(&self, token: &str, active: bool) -> Result<bool, StoreError> {
        self.patch_by_token(token, json!({ "active": active })).await
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let request = self
            .client
            .get(self.table("subscribers"))
            .query(&[("select", "id"), ("limit", "1")]);
        self.execute(request).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}
