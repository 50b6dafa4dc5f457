//! Run command - ingest news and dispatch digests

use alfred_brief_adapters::{
    mail::{OutboxMailer, OutboxWriter, ResendMailer},
    sources::{BbcRssSource, ExchangeRateSource, GovUkGuidanceSource},
};
use alfred_brief_domain::{
    DispatchSummary, IngestSummary, Mailer, NewsSource, SubscriberOutcome, SystemClock,
    usecases::{DispatchConfig, DispatchLoop, IngestUseCase, RenderConfig},
};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::{RunArgs, RunMode};
use crate::commands::{connect_store, load_api_key};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct RunReport {
    mode: &'static str,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ingest: Option<IngestSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch: Option<DispatchSummary>,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let mut dry_run = args.dry_run || config.general.dry_run;
    if args.outbox.is_some() && dry_run {
        tracing::info!("--outbox overrides dry-run");
        dry_run = false;
    }

    tracing::info!(
        mode = ?args.mode,
        dry_run = dry_run,
        outbox = ?args.outbox,
        backend = %config.store.backend,
        "Starting alfred-brief run"
    );

    // Build every capability before doing any work
    let store = connect_store(&config).await?;

    let mailer = if args.mode.dispatches() {
        Some(build_mailer(&config, dry_run, args.outbox.clone()).await?)
    } else {
        None
    };

    let clock = Arc::new(SystemClock);
    let mut report = RunReport {
        mode: mode_name(args.mode),
        dry_run,
        ingest: None,
        dispatch: None,
    };

    if args.mode.ingests() {
        let ingest = IngestUseCase::new(build_sources(&config), Arc::clone(&store), Arc::clone(&clock));
        let summary = ingest.run().await;

        tracing::info!(
            upserted = summary.total_upserted(),
            failed_sources = summary.failed_sources().count(),
            "Ingestion complete"
        );
        report.ingest = Some(summary);
    }

    if let Some(mailer) = mailer {
        let dispatch_config = DispatchConfig {
            dry_run,
            max_concurrent: config.general.max_concurrent.max(1),
            render_config: render_config_from_config(&config),
        };

        let dispatch = DispatchLoop::new(Arc::clone(&store), mailer, clock, dispatch_config);
        let summary = dispatch
            .run_dispatch()
            .await
            .context("Dispatch failed")?;

        tracing::info!(
            sent = summary.sent_count,
            skipped = summary.skipped_count,
            missing_email = summary.missing_email_count,
            errors = summary.errors.len(),
            "Dispatch complete"
        );
        report.dispatch = Some(summary);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    tracing::info!("alfred-brief run completed");
    Ok(())
}

fn mode_name(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Ingest => "ingest",
        RunMode::Dispatch => "dispatch",
        RunMode::All => "all",
    }
}

fn build_sources(config: &AppConfig) -> Vec<Arc<dyn NewsSource>> {
    let timeout = Duration::from_secs(config.sources.timeout_secs);
    let sources = &config.sources;

    let immigration: Arc<dyn NewsSource> = Arc::new(GovUkGuidanceSource::new(
        sources.gov_uk_url.clone(),
        timeout,
        sources.immigration_sections,
    ));
    let tech: Arc<dyn NewsSource> = Arc::new(BbcRssSource::new(
        sources.bbc_feed_url.clone(),
        timeout,
        sources.tech_limit,
    ));
    let finance: Arc<dyn NewsSource> = Arc::new(ExchangeRateSource::new(
        sources.exchange_rate_url.clone(),
        sources.exchange_rate_reference_url.clone(),
        timeout,
    ));

    vec![immigration, tech, finance]
}

async fn build_mailer(
    config: &AppConfig,
    dry_run: bool,
    outbox: Option<PathBuf>,
) -> Result<Arc<dyn Mailer>> {
    if let Some(path) = outbox {
        let writer = OutboxWriter::new(path.clone())
            .await
            .context("Failed to initialize outbox writer")?;
        tracing::info!(outbox = %path.display(), "Writing digests to outbox");
        return Ok(Arc::new(OutboxMailer::new(writer, config.mail.from.clone())));
    }

    if dry_run {
        return Ok(Arc::new(ResendMailer::disabled()));
    }

    match config.mail.provider.trim() {
        "resend" => {
            let api_key = load_api_key(&config.mail.api_key_env, "resend")?;
            Ok(Arc::new(ResendMailer::with_base_url(
                api_key,
                config.mail.base_url.clone(),
                config.mail.from.clone(),
            )))
        }
        other => bail!("Unknown mail provider: {}", other),
    }
}

fn render_config_from_config(config: &AppConfig) -> RenderConfig {
    RenderConfig {
        subject: config.mail.subject.clone(),
        preferences_url: config
            .mail
            .preferences_url
            .as_ref()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()),
        ..Default::default()
    }
}

fn print_report(report: &RunReport) {
    println!(
        "alfred-brief run ({}{})",
        report.mode,
        if report.dry_run { ", dry run" } else { "" }
    );

    if let Some(ingest) = &report.ingest {
        println!();
        println!("Ingestion: {} items upserted", ingest.total_upserted());
        for source in &ingest.sources {
            match &source.error {
                Some(error) => println!("  ✗ {}: {}", source.source, error),
                None => println!(
                    "  ✓ {}: {} fetched, {} upserted",
                    source.source, source.fetched, source.upserted
                ),
            }
        }
    }

    if let Some(dispatch) = &report.dispatch {
        println!();
        println!(
            "Dispatch: {} sent, {} skipped, {} without email, {} failed",
            dispatch.sent_count,
            dispatch.skipped_count,
            dispatch.missing_email_count,
            dispatch.errors.len()
        );
        for (subscriber_id, outcome) in &dispatch.outcomes {
            match outcome {
                SubscriberOutcome::Skipped { reason } => {
                    println!("  - {}: skipped ({})", subscriber_id, reason)
                }
                SubscriberOutcome::MissingEmail => {
                    println!("  - {}: no email address", subscriber_id)
                }
                SubscriberOutcome::Sent { items, .. } => {
                    println!("  ✓ {}: {} items", subscriber_id, items)
                }
                SubscriberOutcome::Failed { error } => println!("  ✗ {}: {}", subscriber_id, error),
            }
        }
    }
}
