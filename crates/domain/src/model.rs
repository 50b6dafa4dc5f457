//! Domain models and value objects

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Topic category shared by ingestion, subscriber preferences and the digest filter.
///
/// This is the single place the category vocabulary is defined. Adding a
/// variant here (and to [`Category::ALL`]) extends every stage at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Immigration,
    Tech,
    Finance,
}

impl Category {
    /// Every known category, in display order
    pub const ALL: [Category; 3] = [Category::Immigration, Category::Tech, Category::Finance];

    /// Canonical lowercase key, as used in stored rows and preference maps
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Immigration => "immigration",
            Category::Tech => "tech",
            Category::Finance => "finance",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Immigration => "Immigration",
            Category::Tech => "Tech",
            Category::Finance => "Finance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings outside the category vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// Per-category opt-in flags for a subscriber.
///
/// Absent keys mean "not subscribed". Deserialization accepts any JSON value
/// and applies truthiness, so `null`, `0`, `""` and `false` all read as off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "BTreeMap<String, bool>")]
pub struct Preferences(BTreeMap<String, bool>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opted in to every known category (the default for new subscribers)
    pub fn all_enabled() -> Self {
        Self::from_categories(Category::ALL)
    }

    /// Opted in to exactly the given categories
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut prefs = Self::new();
        for category in categories {
            prefs.set(category, true);
        }
        prefs
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        self.0.insert(category.as_str().to_string(), enabled);
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.0.get(category.as_str()).copied().unwrap_or(false)
    }

    /// Known categories this subscriber opted in to
    pub fn enabled(&self) -> BTreeSet<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    /// Normalize an untyped preferences document using JSON truthiness
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::new();
        };

        Self(
            map.iter()
                .map(|(key, value)| (key.clone(), is_truthy(value)))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                .collect(),
        )
    }
}

impl From<Value> for Preferences {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

impl From<Preferences> for BTreeMap<String, bool> {
    fn from(prefs: Preferences) -> Self {
        prefs.0
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A record emitted by a news source, before it is stamped and stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCandidate {
    pub category: Category,
    pub title: String,
    /// Canonical source link, the deduplication key
    pub url: String,
    pub summary: Option<String>,
}

impl NewsCandidate {
    pub fn new(category: Category, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            url: url.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Check required fields
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.url.trim().is_empty() {
            return Err(RecordError::EmptyUrl);
        }
        if self.title.trim().is_empty() {
            return Err(RecordError::EmptyTitle {
                url: self.url.clone(),
            });
        }
        Ok(())
    }

    /// Stamp the candidate with its write time
    pub fn into_item(self, scraped_at: OffsetDateTime) -> NewsItem {
        NewsItem {
            category: self.category,
            title: self.title,
            url: self.url,
            summary: self.summary,
            scraped_at,
        }
    }
}

/// A normalized, stored news record. At most one exists per `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub category: Category,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scraped_at: OffsetDateTime,
}

/// Validation failures for records crossing the store boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Record has an empty url")]
    EmptyUrl,
    #[error("Record {url} has an empty title")]
    EmptyTitle { url: String },
}

/// A digest recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    pub active: bool,
    /// Opaque token embedded in the self-service preferences link
    pub management_token: Option<String>,
}

/// Rendered digest content for one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
}

/// A message ready for the mail transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Stable key for this recipient, period and content
    pub idempotency_key: String,
}

/// Why a subscriber received nothing this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No category is enabled in the subscriber's preferences
    NoCategoriesSelected,
    /// Categories are enabled but no item from this period matches them
    NoMatchingItems,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoCategoriesSelected => f.write_str("No categories enabled"),
            SkipReason::NoMatchingItems => f.write_str("No matching news for their preferences"),
        }
    }
}

/// Terminal state of one subscriber within a dispatch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubscriberOutcome {
    /// Excluded because the record has no email address
    MissingEmail,
    Skipped { reason: SkipReason },
    Sent {
        items: usize,
        message_id: Option<String>,
    },
    Failed { error: String },
}

/// Aggregated result of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent_count: usize,
    pub skipped_count: usize,
    /// Active subscribers without an email; not part of `skipped_count`
    pub missing_email_count: usize,
    pub errors: Vec<String>,
    /// Per-subscriber outcomes keyed by subscriber id
    pub outcomes: Vec<(String, SubscriberOutcome)>,
}

impl DispatchSummary {
    /// Tally one subscriber's terminal outcome
    pub fn record(&mut self, subscriber_id: String, outcome: SubscriberOutcome) {
        match &outcome {
            SubscriberOutcome::MissingEmail => self.missing_email_count += 1,
            SubscriberOutcome::Skipped { .. } => self.skipped_count += 1,
            SubscriberOutcome::Sent { .. } => self.sent_count += 1,
            SubscriberOutcome::Failed { error } => self.errors.push(error.clone()),
        }
        self.outcomes.push((subscriber_id, outcome));
    }
}

/// Result of running one source during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub upserted: usize,
    pub error: Option<String>,
}

/// Aggregated result of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub sources: Vec<SourceReport>,
}

impl IngestSummary {
    pub fn total_upserted(&self) -> usize {
        self.sources.iter().map(|s| s.upserted).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}
