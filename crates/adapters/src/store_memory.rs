//! In-memory store for testing and offline mode

use alfred_brief_domain::{
    NewsItem, NewsStore, Preferences, Store, StoreError, Subscriber, SubscriberStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

/// In-memory store implementation
pub struct InMemoryStore {
    items: RwLock<HashMap<String, NewsItem>>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn update_by_token(
        &self,
        token: &str,
        update: impl FnOnce(&mut Subscriber),
    ) -> Result<bool, StoreError> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match subscribers
            .iter_mut()
            .find(|s| s.management_token.as_deref() == Some(token))
        {
            Some(subscriber) => {
                update(subscriber);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    async fn upsert_item(&self, item: &NewsItem) -> Result<(), StoreError> {
        if item.url.trim().is_empty() {
            return Err(StoreError::Validation(
                "news item url must not be empty".to_string(),
            ));
        }

        let mut items = self
            .items
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        items.insert(item.url.clone(), item.clone());
        Ok(())
    }

    async fn items_since(&self, since: OffsetDateTime) -> Result<Vec<NewsItem>, StoreError> {
        let items = self
            .items
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut result: Vec<NewsItem> = items
            .values()
            .filter(|item| item.scraped_at >= since)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        Ok(result)
    }
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(subscribers.iter().filter(|s| s.active).cloned().collect())
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(subscribers.clone())
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<bool, StoreError> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let duplicate = subscriber.email.is_some()
            && subscribers.iter().any(|s| s.email == subscriber.email);
        if duplicate {
            return Ok(false);
        }

        subscribers.push(subscriber.clone());
        Ok(true)
    }

    async fn set_preferences(
        &self,
        token: &str,
        preferences: &Preferences,
    ) -> Result<bool, StoreError> {
        self.update_by_token(token, |s| s.preferences = preferences.clone())
    }

    async fn set_active(&self, token: &str, active: bool) -> Result<bool, StoreError> {
        self.update_by_token(token, |s| s.active = active)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alfred_brief_domain::Category;

    fn item(url: &str, unix: i64) -> NewsItem {
        NewsItem {
            category: Category::Finance,
            title: format!("Item {}", url),
            url: url.to_string(),
            summary: None,
            scraped_at: OffsetDateTime::from_unix_timestamp(unix).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_items_since_filters_and_orders() {
        let store = InMemoryStore::new();
        store.upsert_item(&item("a", 100)).await.unwrap();
        store.upsert_item(&item("b", 300)).await.unwrap();
        store.upsert_item(&item("c", 200)).await.unwrap();

        let items = store
            .items_since(OffsetDateTime::from_unix_timestamp(200).unwrap())
            .await
            .unwrap();

        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_subscribers_without_email_are_not_duplicates() {
        let store = InMemoryStore::new();
        let blank = Subscriber {
            id: "1".to_string(),
            email: None,
            preferences: Preferences::new(),
            active: true,
            management_token: None,
        };

        assert!(store.insert_subscriber(&blank).await.unwrap());
        let second = Subscriber {
            id: "2".to_string(),
            ..blank
        };
        assert!(store.insert_subscriber(&second).await.unwrap());
        assert_eq!(store.active_subscribers().await.unwrap().len(), 2);
    }
}
