mod smtp;
mod templates;

pub use smtp::SmtpNotifier;
pub use templates::EmailTemplate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Alert types that trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertType {
    /// A scan produced at least one opportunity; `digest` is the rendered
    /// markdown text.
    ScanDigest {
        digest: String,
        qualified: usize,
        best_score: Option<f64>,
    },
    /// A scan completed without any ticker passing both gates.
    NoOpportunities { requested: usize },
}

/// A notification alert to be dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            alert_type,
            timestamp: chrono::Utc::now(),
            title: title.into(),
            message: message.into(),
        }
    }

    /// Body text shown by plain-text channels.
    pub fn body(&self) -> &str {
        match &self.alert_type {
            AlertType::ScanDigest { digest, .. } => digest,
            AlertType::NoOpportunities { .. } => &self.message,
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Discord webhook error: {0}")]
    Discord(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_to: Vec<String>,
    pub smtp_tls: SmtpTls,
    pub discord_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let smtp_to = get("NOTIFICATION_EMAIL_TO")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp_tls = match get("SMTP_TLS").unwrap_or_default().to_ascii_lowercase().as_str() {
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => SmtpTls::StartTls,
        };

        Self {
            smtp_host: get("SMTP_HOST"),
            smtp_port: get("SMTP_PORT").and_then(|s| s.parse().ok()).unwrap_or(587),
            smtp_username: get("SMTP_USERNAME"),
            smtp_password: get("SMTP_PASSWORD"),
            smtp_from: get("SMTP_FROM_ADDRESS"),
            smtp_to,
            smtp_tls,
            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
        }
    }
}

/// Delivers alerts to every configured channel.
pub struct NotificationService {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if config.smtp_host.is_some() && config.smtp_from.is_some() && !config.smtp_to.is_empty() {
            match SmtpNotifier::new(config) {
                Ok(notifier) => {
                    tracing::info!(
                        "Email digest enabled (SMTP -> {} recipients)",
                        config.smtp_to.len()
                    );
                    channels.push(Box::new(notifier));
                }
                Err(e) => tracing::warn!("Failed to initialize SMTP notifier: {}", e),
            }
        }

        if let Some(webhook_url) = &config.discord_webhook_url {
            channels.push(Box::new(DiscordWebhookNotifier {
                webhook_url: webhook_url.clone(),
                client: reqwest::Client::new(),
            }));
            tracing::info!("Discord digest enabled");
        }

        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send to every channel in turn. Failures are logged, never returned.
    /// Returns how many channels accepted the alert.
    pub async fn dispatch(&self, alert: &Alert) -> usize {
        let mut delivered = 0;
        for channel in &self.channels {
            match channel.send(alert).await {
                Ok(()) => {
                    tracing::info!("Digest sent via {}", channel.name());
                    delivered += 1;
                }
                Err(e) => tracing::warn!("Failed to send digest via {}: {}", channel.name(), e),
            }
        }
        delivered
    }
}

/// Discord caps embed descriptions at this many characters.
const DISCORD_DESCRIPTION_LIMIT: usize = 4096;

/// Discord webhook notifier.
struct DiscordWebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn discord_payload(alert: &Alert) -> serde_json::Value {
    let color = match &alert.alert_type {
        AlertType::ScanDigest { best_score, .. } => match best_score {
            Some(s) if *s >= 70.0 => 0xff6600,
            Some(s) if *s >= 55.0 => 0x00ff00,
            _ => 0x0099ff,
        },
        AlertType::NoOpportunities { .. } => 0x94a3b8,
    };

    serde_json::json!({
        "embeds": [{
            "title": alert.title,
            "description": truncate_chars(alert.body(), DISCORD_DESCRIPTION_LIMIT),
            "color": color,
            "timestamp": alert.timestamp.to_rfc3339(),
        }]
    })
}

#[async_trait]
impl NotificationChannel for DiscordWebhookNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&discord_payload(alert))
            .send()
            .await
            .map_err(|e| NotificationError::Discord(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Discord(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "discord-webhook"
    }
}
