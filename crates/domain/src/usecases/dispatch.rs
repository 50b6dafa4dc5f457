//! Dispatch use case - emails every active subscriber their personalized digest

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use time::OffsetDateTime;

use crate::{
    compute_send_key,
    model::{DispatchSummary, NewsItem, OutgoingEmail, SkipReason, Subscriber, SubscriberOutcome},
    period_start,
    ports::{Clock, Mailer, NewsStore, StoreError, SubscriberStore},
    usecases::{
        digest::{DigestSelection, select_for},
        render::{DigestRenderer, RenderConfig},
    },
};

/// Configuration for the dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Render and log digests without handing them to the mailer
    pub dry_run: bool,
    /// Maximum sends in flight; 1 keeps dispatch strictly sequential
    pub max_concurrent: usize,
    /// Render config
    pub render_config: RenderConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent: 1,
            render_config: RenderConfig::default(),
        }
    }
}

/// Dispatch orchestrator
pub struct DispatchLoop<St, M, Cl>
where
    St: NewsStore + SubscriberStore + ?Sized,
    M: Mailer + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    mailer: Arc<M>,
    clock: Arc<Cl>,
    config: DispatchConfig,
    renderer: DigestRenderer,
}

impl<St, M, Cl> DispatchLoop<St, M, Cl>
where
    St: NewsStore + SubscriberStore + ?Sized,
    M: Mailer + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, mailer: Arc<M>, clock: Arc<Cl>, config: DispatchConfig) -> Self {
        let renderer = DigestRenderer::new(config.render_config.clone());
        Self {
            store,
            mailer,
            clock,
            config,
            renderer,
        }
    }

    /// Send today's digest to every active subscriber.
    ///
    /// Only store reads fail the whole run. A failed send is recorded in the
    /// summary and the remaining subscribers are still processed.
    pub async fn run_dispatch(&self) -> Result<DispatchSummary, DispatchError> {
        let subscribers = self.store.active_subscribers().await?;
        tracing::info!(count = subscribers.len(), "Found active subscribers");

        if subscribers.is_empty() {
            tracing::info!("No active subscribers, skipping email dispatch");
            return Ok(DispatchSummary::default());
        }

        let period = period_start(self.clock.now());
        let items = self.store.items_since(period).await?;
        tracing::info!(count = items.len(), since = %period, "Loaded news items for period");

        let mut summary = DispatchSummary::default();

        if items.is_empty() {
            tracing::info!("No news items for period, skipping email dispatch");
            for subscriber in subscribers {
                summary.record(
                    subscriber.id,
                    SubscriberOutcome::Skipped {
                        reason: SkipReason::NoMatchingItems,
                    },
                );
            }
            return Ok(summary);
        }

        let items = &items;
        let outcomes: Vec<(String, SubscriberOutcome)> = stream::iter(subscribers.iter())
            .map(|subscriber| async move {
                let outcome = self.dispatch_one(subscriber, items, period).await;
                (subscriber.id.clone(), outcome)
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        for (subscriber_id, outcome) in outcomes {
            summary.record(subscriber_id, outcome);
        }

        tracing::info!(
            sent = summary.sent_count,
            skipped = summary.skipped_count,
            missing_email = summary.missing_email_count,
            errors = summary.errors.len(),
            dry_run = self.config.dry_run,
            "Daily briefs complete"
        );

        Ok(summary)
    }

    /// Drive one subscriber to a terminal outcome
    async fn dispatch_one(
        &self,
        subscriber: &Subscriber,
        items: &[NewsItem],
        period: OffsetDateTime,
    ) -> SubscriberOutcome {
        let Some(email) = subscriber
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            tracing::warn!(subscriber_id = %subscriber.id, "Subscriber has no email, excluding");
            return SubscriberOutcome::MissingEmail;
        };

        let selected = match select_for(items, &subscriber.preferences) {
            DigestSelection::Skip(reason) => {
                tracing::info!(email = %email, reason = %reason, "Skipping subscriber");
                return SubscriberOutcome::Skipped { reason };
            }
            DigestSelection::Send(selected) => selected,
        };

        let digest = self.renderer.render(&selected, subscriber);
        let message = OutgoingEmail {
            to: email.to_string(),
            idempotency_key: compute_send_key(email, period, &digest.subject, &digest.html),
            subject: digest.subject,
            html: digest.html,
        };

        if self.config.dry_run {
            tracing::info!(
                email = %email,
                items = selected.len(),
                subject = %message.subject,
                "[DRY RUN] Would send digest"
            );
            return SubscriberOutcome::Sent {
                items: selected.len(),
                message_id: None,
            };
        }

        match self.mailer.send(&message).await {
            Ok(receipt) => {
                tracing::info!(
                    email = %email,
                    items = selected.len(),
                    transport = self.mailer.transport(),
                    message_id = ?receipt.id,
                    "Sent digest"
                );
                SubscriberOutcome::Sent {
                    items: selected.len(),
                    message_id: receipt.id,
                }
            }
            Err(e) => {
                let error = format!("Failed to send to {}: {}", email, e);
                tracing::error!(email = %email, error = %e, "Failed to send digest");
                SubscriberOutcome::Failed { error }
            }
        }
    }
}

/// Errors from the dispatch loop
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
