//! Messaging platform channel (Telegram).
//!
//! Inbound updates are reduced to an [`InboundMessage`]; replies go out through a
//! [`ChannelHandle`], which never reports failure to its caller.

mod handle;
mod inbound;
mod telegram;

pub use handle::ChannelHandle;
pub use inbound::{IgnoreReason, InboundMessage};
pub use telegram::{
    TelegramChannel, TelegramChat, TelegramError, TelegramMessage, TelegramUpdate,
    MAX_MESSAGE_CHARS,
};
