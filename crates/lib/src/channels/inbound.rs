//! Inbound message from a channel: delivered to the webhook handler for reply resolution.

/// A message from a channel that may be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub conversation_id: i64,
    pub text: String,
}

/// Why an inbound payload produced no message. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Body was not a JSON update.
    Unparsable,
    /// Neither `message` nor `edited_message` present.
    NoMessage,
    /// `chat.id` absent.
    NoChatId,
    /// `text` absent or whitespace-only.
    NoText,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::Unparsable => "unparsable body",
            IgnoreReason::NoMessage => "no message",
            IgnoreReason::NoChatId => "no chat id",
            IgnoreReason::NoText => "no text",
        }
    }
}
