use crate::error::AlerterError;
use async_trait::async_trait;
use configuration::TelegramConfig;
use core_types::PositionStatus;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::time::Duration;

pub mod error;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Delivers one status line per live cycle.
///
/// Delivery failures are reported to the caller, which logs them and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), AlerterError>;
}

/// Builds the status line sent after every cycle, e.g.
/// `+++>>> +0.12. PRICE: 64012. STATUS: Long`.
///
/// The arrow prefix points up only for strictly positive scores. The price is
/// truncated to an integer.
pub fn format_status_line(status: PositionStatus, score: Option<f64>, price: Decimal) -> String {
    let score = score.filter(|s| s.is_finite());
    let sign = match score {
        Some(s) if s > 0.0 => "+++>>>",
        _ => "---<<<",
    };
    let score = match score {
        Some(s) => format!("{:+.2}", s),
        None => "n/a".to_string(),
    };
    let price = price.trunc().to_i64().unwrap_or_default();
    format!("{} {}. PRICE: {}. STATUS: {}", sign, score, price, status)
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Fails with `NotConfigured` if the token or chat_id is missing, which lets
    /// the caller fall back to logging the status line instead.
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, AlerterError> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            return Err(AlerterError::NotConfigured);
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: TELEGRAM_API_URL.to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Sends a text message to the configured Telegram chat.
    ///
    /// The text is escaped for MarkdownV2 before sending.
    pub async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let text = escape_markdown(message);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError { status: status.as_u16(), body });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        self.send_message(message).await
    }
}

/// Writes status lines to the log. Used when Telegram is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        tracing::info!(target: "status", "{}", message);
        Ok(())
    }
}

/// Escapes characters that have special meaning in Telegram's MarkdownV2.
fn escape_markdown(text: &str) -> String {
    let special_chars = r"_*[]()~`>#+-=|{}.!";
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special_chars.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn positive_score_points_up() {
        let line = format_status_line(PositionStatus::Long, Some(0.1234), dec!(64012.87));
        assert_eq!(line, "+++>>> +0.12. PRICE: 64012. STATUS: Long");
    }

    #[test]
    fn zero_and_negative_scores_point_down() {
        assert_eq!(
            format_status_line(PositionStatus::Idle, Some(-0.5), dec!(100)),
            "---<<< -0.50. PRICE: 100. STATUS: Idle"
        );
        assert!(format_status_line(PositionStatus::Idle, Some(0.0), dec!(100)).starts_with("---<<<"));
    }

    #[test]
    fn missing_score_is_shown_as_unavailable() {
        assert_eq!(
            format_status_line(PositionStatus::Short, Some(f64::NAN), dec!(99.9)),
            "---<<< n/a. PRICE: 99. STATUS: Short"
        );
    }

    #[test]
    fn markdown_special_characters_are_escaped() {
        assert_eq!(escape_markdown("+++>>> +0.12."), r"\+\+\+\>\>\> \+0\.12\.");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn missing_credentials_are_reported() {
        let config = TelegramConfig { token: String::new(), chat_id: "42".to_string() };
        assert!(matches!(
            TelegramAlerter::new(&config, Duration::from_secs(1)),
            Err(AlerterError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.notify("---<<< n/a. PRICE: 1. STATUS: Idle").await.is_ok());
    }
}
