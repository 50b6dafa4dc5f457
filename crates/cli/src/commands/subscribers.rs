//! Subscribers command - register and manage digest recipients

use alfred_brief_domain::{
    Category, Preferences, Subscriber, SubscriberStore,
    usecases::{SubscribeOutcome, SubscriptionUseCase},
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::{SubscribersArgs, SubscribersCommands};
use crate::commands::connect_store;
use crate::config::AppConfig;

#[derive(Serialize)]
struct SubscriberView<'a> {
    id: &'a str,
    email: Option<&'a str>,
    active: bool,
    categories: Vec<Category>,
}

impl<'a> From<&'a Subscriber> for SubscriberView<'a> {
    fn from(subscriber: &'a Subscriber) -> Self {
        Self {
            id: &subscriber.id,
            email: subscriber.email.as_deref(),
            active: subscriber.active,
            categories: subscriber.preferences.enabled().into_iter().collect(),
        }
    }
}

pub async fn execute(args: SubscribersArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = connect_store(&config).await?;
    let usecase = SubscriptionUseCase::new(store.clone());

    match args.command {
        SubscribersCommands::Add { email, categories } => {
            let preferences =
                (!categories.is_empty()).then(|| Preferences::from_categories(categories));

            match usecase
                .subscribe(&email, preferences)
                .await
                .context("Failed to add subscriber")?
            {
                SubscribeOutcome::Subscribed {
                    id,
                    management_token,
                } => {
                    println!("Subscribed {}", email.trim().to_lowercase());
                    println!("  id: {}", id);
                    println!("  management token: {}", management_token);
                }
                SubscribeOutcome::AlreadySubscribed => {
                    println!("Already subscribed: {}", email.trim().to_lowercase());
                }
            }
        }
        SubscribersCommands::Preferences { token, categories } => {
            let preferences = Preferences::from_categories(categories);
            usecase
                .update_preferences(&token, &preferences)
                .await
                .context("Failed to update preferences")?;

            let enabled: Vec<&str> = preferences.enabled().iter().map(|c| c.as_str()).collect();
            println!("Preferences updated: {}", enabled.join(", "));
        }
        SubscribersCommands::Unsubscribe { token } => {
            usecase
                .unsubscribe(&token)
                .await
                .context("Failed to unsubscribe")?;
            println!("Unsubscribed");
        }
        SubscribersCommands::List { json } => {
            let subscribers = store
                .list_subscribers()
                .await
                .context("Failed to list subscribers")?;
            let views: Vec<SubscriberView> = subscribers.iter().map(SubscriberView::from).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if views.is_empty() {
                println!("No subscribers");
            } else {
                for view in &views {
                    let categories: Vec<&str> = view.categories.iter().map(|c| c.as_str()).collect();
                    println!(
                        "{} {:<36} {:<32} {}",
                        if view.active { "✓" } else { "✗" },
                        view.id,
                        view.email.unwrap_or("(no email)"),
                        categories.join(",")
                    );
                }
            }
        }
    }

    Ok(())
}
