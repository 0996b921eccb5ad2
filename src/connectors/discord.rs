// src/connectors/discord.rs
use crate::connectors::traits::Notifier;
use crate::types::Notification;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Posts notifications to a Discord channel webhook.
pub struct DiscordNotifier {
    webhook: Url,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(webhook: &str, timeout: Duration) -> Result<Self> {
        let webhook = Url::parse(webhook).context("Invalid Discord webhook URL")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { webhook, client })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::json!({
            "content": format!("{} {}", notification.kind.icon(), notification.message),
        });

        let response = self
            .client
            .post(self.webhook.clone())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Discord webhook failed: {} - {}", status, body));
        }

        debug!("Discord notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_webhook() {
        assert!(DiscordNotifier::new("not a url", Duration::from_secs(1)).is_err());
        assert!(DiscordNotifier::new(
            "https://discord.com/api/webhooks/1/token",
            Duration::from_secs(1)
        )
        .is_ok());
    }
}
