//! Doctor command - validate configuration and check connectivity

use alfred_brief_domain::Store;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::commands::build_store;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    store: CheckResult,
    mail: CheckResult,
    sources: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        store: CheckResult::error("Not checked"),
        mail: CheckResult::error("Not checked"),
        sources: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.store = check_store(config).await;
        report.mail = check_mail(config);
        report.sources = check_sources(config);
    }

    let checks = [&report.config, &report.store, &report.mail, &report.sources];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_store(config: &AppConfig) -> CheckResult {
    let store = match build_store(config).await {
        Ok(store) => store,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match store.ping().await {
        Ok(()) => {
            let result = CheckResult::ok(format!("Backend: {} (reachable)", store.backend()));
            match store.backend() {
                "sqlite" => result.with_details(serde_json::json!({
                    "path": config.store.sqlite_path.display().to_string()
                })),
                "supabase" => result.with_details(serde_json::json!({
                    "url": config.store.supabase_url
                })),
                _ => result,
            }
        }
        Err(e) => CheckResult::error(format!(
            "Backend: {} (unreachable): {}",
            store.backend(),
            e
        )),
    }
}

fn check_mail(config: &AppConfig) -> CheckResult {
    let provider = config.mail.provider.trim();
    if provider != "resend" {
        return CheckResult::error(format!("Unknown mail provider: {}", provider));
    }

    if config.mail.from.trim().is_empty() {
        return CheckResult::error("mail.from is empty");
    }

    let env_var = &config.mail.api_key_env;
    if env_var.is_empty() {
        return CheckResult::error("No API key env var configured for resend");
    }

    // Dry runs and outbox runs work without a key
    match std::env::var(env_var) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Provider: resend, API key: {} (set), From: {}",
            env_var, config.mail.from
        )),
        _ if config.general.dry_run => CheckResult::warn(format!(
            "Provider: resend, API key: {} (not set, dry run only)",
            env_var
        )),
        _ => CheckResult::error(format!(
            "Provider: resend, API key: {} (not set)",
            env_var
        )),
    }
}

fn check_sources(config: &AppConfig) -> CheckResult {
    let sources = &config.sources;
    let urls = [
        ("gov_uk_url", &sources.gov_uk_url),
        ("bbc_feed_url", &sources.bbc_feed_url),
        ("exchange_rate_url", &sources.exchange_rate_url),
    ];

    let empty: Vec<&str> = urls
        .iter()
        .filter(|(_, url)| url.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !empty.is_empty() {
        return CheckResult::error(format!("Empty source urls: {}", empty.join(", ")));
    }

    if sources.timeout_secs == 0 {
        return CheckResult::warn("sources.timeout_secs is 0");
    }

    CheckResult::ok(format!(
        "3 sources configured, timeout {}s",
        sources.timeout_secs
    ))
    .with_details(serde_json::json!({
        "immigration_sections": sources.immigration_sections,
        "tech_limit": sources.tech_limit,
    }))
}

fn print_report(report: &DoctorReport) {
    println!("alfred-brief Doctor Report");
    println!("==========================");
    println!();

    print_check("Config", &report.config);
    print_check("Store", &report.store);
    print_check("Mail", &report.mail);
    print_check("Sources", &report.sources);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall != "error" {
        println!();
        println!("Ready to run! Try: alfred-brief run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
