//! Delivery seam between the webhook handler and a messaging platform.

use async_trait::async_trait;

/// Handle to a messaging channel that can deliver a reply to a conversation.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;

    /// Deliver `text` to `conversation_id`. At most one attempt; failures are logged by the
    /// implementation and reported as `Err` for the caller's bookkeeping only.
    async fn deliver(&self, conversation_id: i64, text: &str) -> Result<(), String>;
}
