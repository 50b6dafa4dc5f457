//! Subscription use case - registration and token-based preference management

use std::sync::{Arc, LazyLock};

use regex::Regex;
use uuid::Uuid;

use crate::{
    model::{Preferences, Subscriber},
    ports::{StoreError, SubscriberStore},
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Trim, lowercase and validate an email address
pub fn normalize_email(raw: &str) -> Result<String, SubscriptionError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(SubscriptionError::InvalidEmail("Email is required".to_string()));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(SubscriptionError::InvalidEmail(format!(
            "Invalid email format: {}",
            raw.trim()
        )));
    }
    Ok(email)
}

/// Result of a subscribe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed { id: String, management_token: String },
    /// The email was already registered; nothing changed
    AlreadySubscribed,
}

/// Errors from subscription management
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    InvalidEmail(String),
    #[error("Invalid or expired management token")]
    UnknownToken,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct SubscriptionUseCase<St: SubscriberStore + ?Sized> {
    store: Arc<St>,
}

impl<St: SubscriberStore + ?Sized> SubscriptionUseCase<St> {
    pub fn new(store: Arc<St>) -> Self {
        Self { store }
    }

    /// Register a new active subscriber.
    ///
    /// Preferences default to every category. An email that is already
    /// registered is left untouched.
    pub async fn subscribe(
        &self,
        email: &str,
        preferences: Option<Preferences>,
    ) -> Result<SubscribeOutcome, SubscriptionError> {
        let email = normalize_email(email)?;
        let subscriber = Subscriber {
            id: Uuid::new_v4().to_string(),
            email: Some(email.clone()),
            preferences: preferences.unwrap_or_else(Preferences::all_enabled),
            active: true,
            management_token: Some(Uuid::new_v4().simple().to_string()),
        };

        if !self.store.insert_subscriber(&subscriber).await? {
            tracing::info!(email = %email, "Subscriber already exists");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        tracing::info!(email = %email, subscriber_id = %subscriber.id, "Subscribed");
        Ok(SubscribeOutcome::Subscribed {
            id: subscriber.id,
            management_token: subscriber.management_token.unwrap_or_default(),
        })
    }

    /// Replace the preferences behind a management token
    pub async fn update_preferences(
        &self,
        token: &str,
        preferences: &Preferences,
    ) -> Result<(), SubscriptionError> {
        let token = token.trim();
        if token.is_empty() || !self.store.set_preferences(token, preferences).await? {
            return Err(SubscriptionError::UnknownToken);
        }
        tracing::info!(categories = ?preferences.enabled(), "Updated preferences");
        Ok(())
    }

    /// Deactivate the subscriber behind a management token
    pub async fn unsubscribe(&self, token: &str) -> Result<(), SubscriptionError> {
        let token = token.trim();
        if token.is_empty() || !self.store.set_active(token, false).await? {
            return Err(SubscriptionError::UnknownToken);
        }
        tracing::info!("Unsubscribed");
        Ok(())
    }
}
