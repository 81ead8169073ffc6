//! Webhook handler: one inbound update in, at most one reply out, always success.
//!
//! Every branch ends in a [`WebhookOutcome`]; the HTTP layer maps all of them to `200 OK`.
//! A panic anywhere below the handler is caught and reported as [`WebhookOutcome::Panicked`].

use crate::channels::{ChannelHandle, IgnoreReason, InboundMessage, TelegramUpdate};
use crate::commands::CommandResolver;
use crate::rate_limit::{self, RateLimiter};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// What happened to one webhook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Payload had nothing to answer.
    Ignored(IgnoreReason),
    /// Conversation replied to too recently.
    RateLimited,
    /// Reply handed to the channel successfully.
    Delivered,
    /// Reply resolved but the channel could not deliver it.
    DeliveryFailed(String),
    /// Something below the handler panicked.
    Panicked,
}

/// Orchestrates parse -> throttle -> resolve -> deliver.
#[derive(Clone)]
pub struct WebhookHandler {
    rate_limiter: RateLimiter,
    resolver: Arc<CommandResolver>,
    channel: Arc<dyn ChannelHandle>,
}

impl WebhookHandler {
    pub fn new(
        rate_limiter: RateLimiter,
        resolver: Arc<CommandResolver>,
        channel: Arc<dyn ChannelHandle>,
    ) -> Self {
        Self {
            rate_limiter,
            resolver,
            channel,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    /// Handle a raw webhook body at the current wall-clock time.
    pub async fn handle(&self, body: &[u8]) -> WebhookOutcome {
        self.handle_at(body, rate_limit::now_secs()).await
    }

    /// Handle a raw webhook body as if received at `now` (seconds since epoch). Never panics.
    pub async fn handle_at(&self, body: &[u8], now: u64) -> WebhookOutcome {
        let outcome = match AssertUnwindSafe(self.process(body, now))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                log::error!("webhook: handler panicked: {}", panic_message(&*panic));
                WebhookOutcome::Panicked
            }
        };
        match &outcome {
            WebhookOutcome::Ignored(reason) => log::debug!("webhook: ignored ({})", reason.as_str()),
            WebhookOutcome::RateLimited => log::debug!("webhook: rate limited"),
            WebhookOutcome::Delivered => log::debug!("webhook: reply delivered"),
            WebhookOutcome::DeliveryFailed(e) => log::warn!("webhook: delivery failed: {}", e),
            WebhookOutcome::Panicked => {}
        }
        outcome
    }

    async fn process(&self, body: &[u8], now: u64) -> WebhookOutcome {
        let msg = match TelegramUpdate::parse(body).and_then(TelegramUpdate::into_inbound) {
            Ok(msg) => msg,
            Err(reason) => return WebhookOutcome::Ignored(reason),
        };
        self.process_message(msg, now).await
    }

    /// Throttle, resolve, and deliver an already-extracted message.
    pub async fn process_message(&self, msg: InboundMessage, now: u64) -> WebhookOutcome {
        if msg.text.trim().is_empty() {
            return WebhookOutcome::Ignored(IgnoreReason::NoText);
        }
        if !self.rate_limiter.allow(msg.conversation_id, now).await {
            log::debug!("webhook: conversation {} throttled", msg.conversation_id);
            return WebhookOutcome::RateLimited;
        }
        let reply = self.resolver.resolve(&msg.text).await;
        match self.channel.deliver(msg.conversation_id, &reply).await {
            Ok(()) => WebhookOutcome::Delivered,
            Err(e) => WebhookOutcome::DeliveryFailed(e),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::default_commands;
    use crate::llm::ReplyProducer;
    use crate::templates::{Category, TemplateStore};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records deliveries; optionally fails or panics.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(i64, String)>>,
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl ChannelHandle for RecordingChannel {
        fn id(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, conversation_id: i64, text: &str) -> Result<(), String> {
            if self.panic {
                panic!("boom");
            }
            self.sent.lock().await.push((conversation_id, text.to_string()));
            if self.fail {
                return Err("send failed".to_string());
            }
            Ok(())
        }
    }

    fn handler_with(channel: Arc<RecordingChannel>) -> WebhookHandler {
        let resolver = CommandResolver::new(
            default_commands(),
            TemplateStore::default(),
            ReplyProducer::TemplateOnly,
        );
        WebhookHandler::new(RateLimiter::new(3, 10), Arc::new(resolver), channel)
    }

    const NOW: u64 = 1_700_000_000;

    #[tokio::test]
    async fn help_is_delivered_to_chat() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let outcome = handler
            .handle_at(br#"{"message":{"chat":{"id":42},"text":"/help"}}"#, NOW)
            .await;
        assert_eq!(outcome, WebhookOutcome::Delivered);
        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert_eq!(sent[0].1, TemplateStore::default().first(Category::Help));
    }

    #[tokio::test]
    async fn payloads_without_chat_or_text_deliver_nothing() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let bodies: [&[u8]; 6] = [
            b"",
            b"garbage",
            br#"{"update_id":5}"#,
            br#"{"message":{"text":"/help"}}"#,
            br#"{"message":{"chat":{"id":1}}}"#,
            br#"{"message":{"chat":{"id":2},"text":"   "}}"#,
        ];
        for body in bodies {
            assert!(matches!(
                handler.handle_at(body, NOW).await,
                WebhookOutcome::Ignored(_)
            ));
        }
        assert!(channel.sent.lock().await.is_empty());
        assert!(handler.rate_limiter().is_empty().await);
    }

    #[tokio::test]
    async fn second_message_within_interval_is_dropped() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let body = br#"{"message":{"chat":{"id":42},"text":"/help"}}"#;
        assert_eq!(handler.handle_at(body, NOW).await, WebhookOutcome::Delivered);
        assert_eq!(handler.handle_at(body, NOW + 1).await, WebhookOutcome::RateLimited);
        assert_eq!(channel.sent.lock().await.len(), 1);
        assert_eq!(handler.handle_at(body, NOW + 3).await, WebhookOutcome::Delivered);
        assert_eq!(channel.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn edited_message_is_handled_like_message() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let outcome = handler
            .handle_at(br#"{"edited_message":{"chat":{"id":42},"text":"/help"}}"#, NOW)
            .await;
        assert_eq!(outcome, WebhookOutcome::Delivered);
        assert_eq!(channel.sent.lock().await[0].0, 42);
    }

    #[tokio::test]
    async fn unrelated_mistyped_fields_still_get_a_reply() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let bodies: [&[u8]; 3] = [
            br#"{"update_id":"abc","message":{"chat":{"id":42},"text":"/help"}}"#,
            br#"{"message":{"chat":{"id":43},"text":"/help"},"edited_message":5}"#,
            br#"{"message":{},"edited_message":{"chat":{"id":44},"text":"/help"}}"#,
        ];
        for body in bodies {
            assert_eq!(handler.handle_at(body, NOW).await, WebhookOutcome::Delivered);
        }
        let ids: Vec<i64> = channel.sent.lock().await.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![42, 43, 44]);
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_as_outcome() {
        let channel = Arc::new(RecordingChannel {
            fail: true,
            ..RecordingChannel::default()
        });
        let handler = handler_with(channel);
        let outcome = handler
            .handle_at(br#"{"message":{"chat":{"id":3},"text":"hi"}}"#, NOW)
            .await;
        assert_eq!(outcome, WebhookOutcome::DeliveryFailed("send failed".to_string()));
    }

    #[tokio::test]
    async fn panic_below_handler_is_caught() {
        let channel = Arc::new(RecordingChannel {
            panic: true,
            ..RecordingChannel::default()
        });
        let handler = handler_with(channel);
        let outcome = handler
            .handle_at(br#"{"message":{"chat":{"id":3},"text":"hi"}}"#, NOW)
            .await;
        assert_eq!(outcome, WebhookOutcome::Panicked);
    }

    #[tokio::test]
    async fn process_message_ignores_blank_text() {
        let channel = Arc::new(RecordingChannel::default());
        let handler = handler_with(channel.clone());
        let msg = InboundMessage {
            conversation_id: 1,
            text: " \n ".to_string(),
        };
        assert_eq!(
            handler.process_message(msg, NOW).await,
            WebhookOutcome::Ignored(IgnoreReason::NoText)
        );
        assert!(channel.sent.lock().await.is_empty());
    }
}
