//! Discord webhook delivery for alerts and status reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use watchdog::sinks::Notifier;
use watchdog::{ReportRow, SignalKind, StatusReport};

/// Embed accent color used for status updates
pub const STATUS_COLOR: u32 = 7506394;

/// Embed field carrying the segment backlog
pub const BACKLOG_FIELD: &str = "Current .ts Files";

/// Embed field name for a report row. Process-activity rows read as usage.
fn field_name(row: &ReportRow) -> String {
    match row.kind {
        SignalKind::ProcessActivity => format!("{} Usage", row.label),
        _ => row.label.clone(),
    }
}

/// Webhook request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl WebhookMessage {
    /// Plain-text alert
    pub fn alert(message: &str, username: &str) -> Self {
        Self {
            content: Some(message.to_string()),
            username: Some(username.to_string()),
            embeds: Vec::new(),
        }
    }

    /// "Status Update" embed built from a report
    pub fn status_update(report: &StatusReport, username: &str) -> Self {
        let mut fields = vec![EmbedField::new("Last Checked", &report.checked_at, false)];
        fields.extend(
            report
                .rows
                .iter()
                .map(|row| EmbedField::new(field_name(row), row.value(), true)),
        );
        fields.push(EmbedField::new(BACKLOG_FIELD, report.backlog_text(), true));
        fields.push(EmbedField::new("Passes", report.passes.to_string(), true));
        fields.push(EmbedField::new("Fails", report.fails.to_string(), true));

        Self {
            content: None,
            username: Some(username.to_string()),
            embeds: vec![Embed {
                title: "Status Update".to_string(),
                color: STATUS_COLOR,
                fields,
                footer: EmbedFooter {
                    text: username.to_string(),
                },
            }],
        }
    }
}

/// Posts alerts and reports to a Discord webhook
pub struct DiscordNotifier {
    webhook_url: String,
    username: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    /// Create a new notifier
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        timeout_duration: Duration,
    ) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(common::Error::notify)?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            client,
        })
    }

    async fn post(&self, message: &WebhookMessage) -> common::Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(common::Error::notify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(common::Error::notify(format!(
                "webhook returned {}: {}",
                status,
                body.trim()
            )));
        }

        debug!(status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn alert(&self, message: &str) -> common::Result<()> {
        self.post(&WebhookMessage::alert(message, &self.username)).await?;
        info!("Discord notification sent");
        Ok(())
    }

    async fn report(&self, report: &StatusReport) -> common::Result<()> {
        self.post(&WebhookMessage::status_update(report, &self.username))
            .await
    }
}
