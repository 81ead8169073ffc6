//! Generative backend client and the reply-producer capability.
//!
//! The producer is chosen once at startup from configuration: `Generative` when an api key is
//! present, `TemplateOnly` otherwise.

mod openai;
mod producer;

pub use openai::{
    GenerativeError, OpenAiClient, API_ERROR_REPLY, DISABLED_REPLY, MALFORMED_REPLY,
    RATE_LIMITED_REPLY, REQUEST_FAILED_REPLY,
};
pub(crate) use openai::truncate;
pub use producer::ReplyProducer;
