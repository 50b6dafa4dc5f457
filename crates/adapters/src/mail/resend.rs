//! Resend email API adapter

use alfred_brief_domain::{Mailer, OutgoingEmail, SendError, SendReceipt};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Sends digests through the Resend HTTP API
pub struct ResendMailer {
    client: Client,
    api_key: SecretString,
    base_url: String,
    from: String,
    enabled: bool,
}

impl ResendMailer {
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), from)
    }

    pub fn with_base_url(api_key: SecretString, base_url: String, from: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            from: from.into(),
            enabled: true,
        }
    }

    /// Create a disabled mailer (for dry runs without credentials)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new("".into()),
            base_url: String::new(),
            from: String::new(),
            enabled: false,
        }
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError> {
        if !self.enabled {
            return Err(SendError::Api("Mailer is disabled".to_string()));
        }

        let request = SendEmailRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let url = format!("{}/emails", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Idempotency-Key", &email.idempotency_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Auth(body));
        }

        if status == 429 {
            return Err(SendError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Api(format!(
                "Resend returned {}: {}",
                status, body
            )));
        }

        let body: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        tracing::debug!(to = %email.to, message_id = ?body.id, "Email accepted");

        Ok(SendReceipt { id: body.id })
    }

    fn transport(&self) -> &'static str {
        "resend"
    }
}
