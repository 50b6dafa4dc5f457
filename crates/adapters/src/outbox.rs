//! Outbox mailer: appends digests to a JSONL file instead of sending them.

use alfred_brief_domain::{Mailer, OutgoingEmail, SendError, SendReceipt};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    written_at: OffsetDateTime,
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    idempotency_key: &'a str,
    html: &'a str,
}

/// Mailer that records each digest as one JSON line
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    writer: OutboxWriter,
    from: String,
}

impl OutboxMailer {
    pub fn new(writer: OutboxWriter, from: impl Into<String>) -> Self {
        Self {
            writer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError> {
        let id = Uuid::new_v4().to_string();
        let entry = OutboxEntry {
            id: &id,
            written_at: OffsetDateTime::now_utc(),
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            idempotency_key: &email.idempotency_key,
            html: &email.html,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| SendError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::debug!(path = %self.writer.path().display(), to = %email.to, "Wrote digest to outbox");

        Ok(SendReceipt { id: Some(id) })
    }

    fn transport(&self) -> &'static str {
        "outbox"
    }
}
