//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{NewsCandidate, NewsItem, OutgoingEmail, Preferences, Subscriber};

/// Error type for news source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for fetching candidate records from one external source
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch and normalize the current content of the source
    async fn fetch(&self) -> Result<Vec<NewsCandidate>, SourceError>;

    /// Short source name for logs and reports
    fn name(&self) -> &'static str;
}

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Port for news item persistence
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Insert or update the item keyed by its url.
    ///
    /// Every other field is overwritten. Applying the same write twice leaves
    /// the same state as applying it once. An empty url is rejected.
    async fn upsert_item(&self, item: &NewsItem) -> Result<(), StoreError>;

    /// Items with `scraped_at >= since`, newest first
    async fn items_since(&self, since: OffsetDateTime) -> Result<Vec<NewsItem>, StoreError>;
}

/// Port for subscriber persistence
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// All subscribers with `active = true`, in no particular order
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Every subscriber, active or not
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Insert a subscriber unless one with the same email exists.
    /// Returns `false` when the email was already present.
    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<bool, StoreError>;

    /// Replace the preferences of the subscriber owning `token`.
    /// Returns `false` when no subscriber has that token.
    async fn set_preferences(
        &self,
        token: &str,
        preferences: &Preferences,
    ) -> Result<bool, StoreError>;

    /// Set the active flag of the subscriber owning `token`.
    /// Returns `false` when no subscriber has that token.
    async fn set_active(&self, token: &str, active: bool) -> Result<bool, StoreError>;
}

/// A complete store backend
#[async_trait]
pub trait Store: NewsStore + SubscriberStore {
    /// Cheap round-trip used to fail fast before any work starts
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name (e.g., "sqlite", "supabase")
    fn backend(&self) -> &'static str;
}

/// Error type for mail transport operations
#[derive(Debug, Error)]
pub enum SendError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Result of a successful send
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider message ID, if the transport returns one
    pub id: Option<String>,
}

/// Port for delivering digests
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError>;

    /// Transport name (e.g., "resend", "outbox")
    fn transport(&self) -> &'static str;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
