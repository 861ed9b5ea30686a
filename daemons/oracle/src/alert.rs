//! Best-effort Telegram webhook client. Alerts are fire-and-forget: a
//! delivery failure is logged and never propagated to the caller, since
//! losing an alert must not interrupt the poll loop that triggered it.

use bridge_core::util::scrub::scrub_url;
use std::time::Duration;

const ALERT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramAlerter {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramAlerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAlerter").field("chat_id", &self.chat_id).finish()
    }
}

impl TelegramAlerter {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(ALERT_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, bot_token, chat_id }
    }

    /// Sends `text` to the configured chat. Never returns an error to the
    /// caller; failures are logged at `warn` with the bot token scrubbed.
    pub async fn send(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({ "chat_id": self.chat_id, "text": text });
        let result = self.http.post(&url).json(&body).send().await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    url = %scrub_url(&url),
                    "telegram alert rejected"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %scrub_url(&url), "telegram alert delivery failed");
            }
        }
    }
}

/// Wraps an optional alerter so callers don't need to branch on whether
/// alerting is configured at all.
#[derive(Clone, Debug, Default)]
pub struct Alerter(Option<TelegramAlerter>);

impl Alerter {
    pub fn configured(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        match (bot_token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Self(Some(TelegramAlerter::new(token, chat_id)))
            }
            _ => Self(None),
        }
    }

    pub async fn alert(&self, text: &str) {
        if let Some(alerter) = &self.0 {
            alerter.send(text).await;
        } else {
            tracing::debug!(text, "alerting not configured, dropping alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_when_either_field_missing() {
        assert!(matches!(Alerter::configured(None, Some("chat".into())), Alerter(None)));
        assert!(matches!(Alerter::configured(Some("tok".into()), None), Alerter(None)));
        assert!(matches!(Alerter::configured(Some(String::new()), Some("chat".into())), Alerter(None)));
    }

    #[test]
    fn configured_when_both_present() {
        assert!(matches!(Alerter::configured(Some("tok".into()), Some("chat".into())), Alerter(Some(_))));
    }
}
