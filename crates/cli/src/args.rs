//! CLI argument definitions

use alfred_brief_domain::Category;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// alfred-brief: scrape daily news sources and email subscribers a personalized digest
#[derive(Parser, Debug)]
#[command(name = "alfred-brief")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest news, dispatch digests, or both
    Run(RunArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and check connectivity
    Doctor(DoctorArgs),

    /// Manage subscribers
    Subscribers(SubscribersArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Scrape sources into the store
    Ingest,
    /// Email today's digest to active subscribers
    Dispatch,
    /// Ingest, then dispatch
    All,
}

impl RunMode {
    pub fn ingests(self) -> bool {
        matches!(self, RunMode::Ingest | RunMode::All)
    }

    pub fn dispatches(self) -> bool {
        matches!(self, RunMode::Dispatch | RunMode::All)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Which stages to run
    #[arg(long, value_enum, default_value_t = RunMode::All)]
    pub mode: RunMode,

    /// Render digests without sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Write digests to this JSONL file instead of sending them
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SubscribersArgs {
    #[command(subcommand)]
    pub command: SubscribersCommands,
}

#[derive(Subcommand, Debug)]
pub enum SubscribersCommands {
    /// Register a new subscriber
    Add {
        /// Email address
        #[arg(long)]
        email: String,

        /// Comma-separated categories (defaults to all)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<Category>,
    },

    /// Replace a subscriber's categories
    Preferences {
        /// Management token from the subscriber's digest link
        #[arg(long)]
        token: String,

        /// Comma-separated categories
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<Category>,
    },

    /// Deactivate a subscriber
    Unsubscribe {
        /// Management token from the subscriber's digest link
        #[arg(long)]
        token: String,
    },

    /// List all subscribers
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
