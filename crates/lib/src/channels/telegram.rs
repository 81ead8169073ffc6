//! Telegram channel: webhook update parsing and sendMessage via Bot API.

use crate::channels::handle::ChannelHandle;
use crate::channels::inbound::{IgnoreReason, InboundMessage};
use crate::config::TelegramChannelConfig;
use crate::llm::truncate;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Telegram rejects sendMessage text longer than this many UTF-16 code units.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const LOG_BODY_LIMIT: usize = 200;

/// Telegram update payload (webhook POST body). Only the fields the relay reads are kept.
/// Every field is optional, and a field of the wrong type reads as absent.
#[derive(Debug, Default, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<TelegramMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub edited_message: Option<TelegramMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub chat: Option<TelegramChat>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramChat {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
}

/// Deserialize `T`, turning a value of the wrong shape into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl TelegramMessage {
    /// Neither chat nor text: carries nothing to answer.
    fn is_empty(&self) -> bool {
        self.chat.is_none() && self.text.is_none()
    }
}

impl TelegramUpdate {
    /// Parse a raw webhook body. Only a body that is not JSON at all yields `Unparsable`.
    pub fn parse(body: &[u8]) -> Result<Self, IgnoreReason> {
        serde_json::from_slice(body).map_err(|e| {
            log::debug!("telegram: unparsable update: {}", e);
            IgnoreReason::Unparsable
        })
    }

    /// Reduce to a message worth answering. `edited_message` is used when `message` is absent
    /// or empty. Text is trimmed.
    pub fn into_inbound(self) -> Result<InboundMessage, IgnoreReason> {
        let message = self
            .message
            .filter(|m| !m.is_empty())
            .or(self.edited_message.filter(|m| !m.is_empty()))
            .ok_or(IgnoreReason::NoMessage)?;
        let conversation_id = message
            .chat
            .and_then(|c| c.id)
            .ok_or(IgnoreReason::NoChatId)?;
        let text = message
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(IgnoreReason::NoText)?;
        Ok(InboundMessage {
            conversation_id,
            text,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram bot token not configured")]
    NotConfigured,
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("telegram {method} failed: {status} {body}")]
    Api {
        method: &'static str,
        status: u16,
        body: String,
    },
}

/// Telegram channel connector: sends replies and manages webhook registration.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// `token` is the resolved bot token (env or config); `None` turns delivery into a logged no-op.
    pub fn new(config: &TelegramChannelConfig, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.effective_timeout_secs()))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("telegram: falling back to default http client: {}", e);
                reqwest::Client::new()
            });
        Self {
            id: "telegram".to_string(),
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    fn method_url(&self, method: &str) -> Result<String, TelegramError> {
        let token = self.token.as_ref().ok_or(TelegramError::NotConfigured)?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    async fn post(
        &self,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<(), TelegramError> {
        let url = self.method_url(method)?;
        let res = self.client.post(&url).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TelegramError::Api {
                method,
                status: status.as_u16(),
                body: truncate(&body, LOG_BODY_LIMIT).to_string(),
            });
        }
        log::debug!("telegram {} ok: {}", method, status);
        Ok(())
    }

    /// Send a text message to a chat via sendMessage API. Text over the platform limit is truncated.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let text = truncate_utf16(text, MAX_MESSAGE_CHARS);
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.post("sendMessage", &body).await
    }

    /// Set webhook URL. When set, Telegram POSTs updates to the URL.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let body = serde_json::json!({ "url": url });
        self.post("setWebhook", &body).await
    }

    /// Remove the webhook registration.
    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        self.post("deleteWebhook", &serde_json::json!({})).await
    }
}

/// Cut `s` to at most `limit` UTF-16 code units without splitting a char.
fn truncate_utf16(s: &str, limit: usize) -> &str {
    let mut units = 0;
    for (idx, c) in s.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return &s[..idx];
        }
    }
    s
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn deliver(&self, conversation_id: i64, text: &str) -> Result<(), String> {
        match self.send_message(conversation_id, text).await {
            Ok(()) => Ok(()),
            Err(TelegramError::NotConfigured) => {
                log::error!("telegram: bot token not set, dropping reply to {}", conversation_id);
                Err(TelegramError::NotConfigured.to_string())
            }
            Err(e) => {
                log::warn!("telegram: delivery to {} failed: {}", conversation_id, e);
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel_for(server: &MockServer, token: Option<&str>) -> TelegramChannel {
        let config = TelegramChannelConfig {
            api_base: server.uri(),
            ..TelegramChannelConfig::default()
        };
        TelegramChannel::new(&config, token.map(str::to_string))
    }

    #[test]
    fn parse_message_update() {
        let update =
            TelegramUpdate::parse(br#"{"update_id":1,"message":{"chat":{"id":42},"text":" /help "}}"#)
                .expect("parse");
        assert_eq!(
            update.into_inbound(),
            Ok(InboundMessage {
                conversation_id: 42,
                text: "/help".to_string()
            })
        );
    }

    #[test]
    fn edited_message_used_when_message_absent() {
        let update =
            TelegramUpdate::parse(br#"{"edited_message":{"chat":{"id":9},"text":"hi"}}"#).expect("parse");
        assert_eq!(update.into_inbound().map(|m| m.conversation_id), Ok(9));
    }

    #[test]
    fn missing_fields_are_ignore_reasons() {
        let cases: [(&[u8], IgnoreReason); 6] = [
            (b"not json", IgnoreReason::Unparsable),
            (b"", IgnoreReason::Unparsable),
            (br#"{"message":{"chat":{"id":"x"},"text":"a"}}"#, IgnoreReason::NoChatId),
            (br#"{}"#, IgnoreReason::NoMessage),
            (br#"{"message":{"text":"hi"}}"#, IgnoreReason::NoChatId),
            (br#"{"message":{"chat":{"id":1},"text":"   "}}"#, IgnoreReason::NoText),
        ];
        for (body, expected) in cases {
            let got = TelegramUpdate::parse(body).and_then(TelegramUpdate::into_inbound);
            assert_eq!(got, Err(expected), "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn fields_of_wrong_type_do_not_hide_a_valid_message() {
        let cases: [(&[u8], i64); 4] = [
            (br#"{"update_id":"abc","message":{"chat":{"id":42},"text":"/help"}}"#, 42),
            (br#"{"message":{"chat":{"id":43},"text":"/help"},"edited_message":5}"#, 43),
            (br#"{"message":{},"edited_message":{"chat":{"id":44},"text":"/help"}}"#, 44),
            (br#"{"message":null,"edited_message":{"chat":{"id":45,"type":7},"text":"hi"}}"#, 45),
        ];
        for (body, expected) in cases {
            let got = TelegramUpdate::parse(body)
                .and_then(TelegramUpdate::into_inbound)
                .map(|m| m.conversation_id);
            assert_eq!(got, Ok(expected), "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn truncate_utf16_counts_surrogate_pairs() {
        assert_eq!(truncate_utf16("abc", 10), "abc");
        assert_eq!(truncate_utf16("ab😀c", 3), "ab");
        assert_eq!(truncate_utf16("ab😀c", 4), "ab😀");
        let emoji = "😀".repeat(MAX_MESSAGE_CHARS);
        let cut = truncate_utf16(&emoji, MAX_MESSAGE_CHARS);
        assert_eq!(cut.encode_utf16().count(), MAX_MESSAGE_CHARS);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS / 2);
    }

    #[tokio::test]
    async fn send_message_posts_chat_id_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(serde_json::json!({ "chat_id": 42, "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        let channel = channel_for(&server, Some("TOKEN"));
        assert!(channel.deliver(42, "hello").await.is_ok());
    }

    #[tokio::test]
    async fn api_error_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
            .expect(2)
            .mount(&server)
            .await;
        let channel = channel_for(&server, Some("TOKEN"));
        let err = channel.send_message(1, "x").await.unwrap_err();
        assert!(matches!(err, TelegramError::Api { status: 400, .. }));
        assert!(channel.deliver(1, "x").await.is_err());
    }

    #[tokio::test]
    async fn no_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let channel = channel_for(&server, None);
        assert!(!channel.is_configured());
        assert!(channel.deliver(1, "x").await.is_err());
    }

    #[tokio::test]
    async fn long_text_is_truncated_to_platform_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let channel = channel_for(&server, Some("TOKEN"));
        let long = "é😀".repeat(MAX_MESSAGE_CHARS);
        channel.send_message(5, &long).await.expect("send");
        let requests = server.received_requests().await.expect("recording enabled");
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json");
        assert_eq!(
            sent["text"].as_str().map(|s| s.encode_utf16().count()),
            Some(MAX_MESSAGE_CHARS)
        );
    }

    #[tokio::test]
    async fn set_and_delete_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/setWebhook"))
            .and(body_json(serde_json::json!({ "url": "https://example.com/webhook" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/deleteWebhook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let channel = channel_for(&server, Some("TOKEN"));
        channel
            .set_webhook("https://example.com/webhook")
            .await
            .expect("set");
        channel.delete_webhook().await.expect("delete");
    }
}
