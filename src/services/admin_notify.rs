use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::config::Settings;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Fire-and-forget channel to the operators.
#[async_trait]
pub(crate) trait AdminNotifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

pub(crate) struct DisabledNotifier;

#[async_trait]
impl AdminNotifier for DisabledNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::debug!(text = message, "Admin notifications disabled; dropping message");
        Ok(())
    }
}

pub(crate) struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    pub(crate) fn new(
        api_base: &str,
        token: String,
        chat_id: i64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self { client, api_base: api_base.trim_end_matches('/').to_string(), token, chat_id })
    }
}

#[async_trait]
impl AdminNotifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_base, self.token))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .context("Failed to send Telegram message")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Telegram sendMessage returned HTTP {status}");
        }
        Ok(())
    }
}

pub(crate) fn from_settings(settings: &Settings) -> Result<Arc<dyn AdminNotifier>> {
    let notifications = settings.notifications();
    match notifications.admin_chat_id {
        Some(chat_id) if notifications.is_configured() => {
            let notifier = TelegramNotifier::new(
                TELEGRAM_API_BASE,
                notifications.telegram_token.clone(),
                chat_id,
                Duration::from_secs(notifications.timeout_seconds.max(1)),
            )?;
            Ok(Arc::new(notifier))
        }
        _ => {
            tracing::info!("Admin notifications are not configured");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

/// Sends in the background; failures and timeouts are only logged.
pub(crate) fn spawn_notify(notifier: Arc<dyn AdminNotifier>, message: String, timeout: Duration) {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.notify(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Failed to notify administrator");
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Admin notification timed out");
            }
        }
    });
}
