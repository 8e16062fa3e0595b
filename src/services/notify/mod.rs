use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;

/// Alert email handed to the mail service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Alert {
    /// Upstream-down alert naming the threshold and the latest error
    pub fn upstream_down(from: &str, to: &str, threshold: u32, last_error: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Live score feed is failing".to_string(),
            body: format!(
                "The live score feed failed {} consecutive times (as of {}).\n\nMost recent error: {}\n",
                threshold,
                Utc::now().to_rfc3339(),
                last_error
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Mail service rejected alert with status {0}")]
    Rejected(StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Sends alerts through the email-delivery service's HTTP API
pub struct MailServiceNotifier {
    client: Client,
    url: String,
}

impl MailServiceNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for MailServiceNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .header("User-Agent", "LiveScore-Alerts/1.0")
            .json(alert)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status));
        }

        tracing::info!("Alert sent to {}", alert.to);
        Ok(())
    }
}
