//! Reply producer: generative backend or template pool, selected once from configuration.

use crate::config::{self, Config};
use crate::llm::OpenAiClient;

/// How themed and freeform replies are produced.
#[derive(Clone)]
pub enum ReplyProducer {
    /// Delegate to the generative backend.
    Generative(OpenAiClient),
    /// Template pools and fixed fallback text only; never touches the network.
    TemplateOnly,
}

impl ReplyProducer {
    /// Generative when an api key resolves from env or config, template-only otherwise.
    pub fn from_config(config: &Config) -> Self {
        match config::resolve_generative_key(config) {
            Some(key) => ReplyProducer::Generative(OpenAiClient::new(&config.generative, Some(key))),
            None => ReplyProducer::TemplateOnly,
        }
    }

    pub fn is_generative(&self) -> bool {
        matches!(self, ReplyProducer::Generative(_))
    }

    /// Short mode label for logs and the health endpoint.
    pub fn mode_name(&self) -> &'static str {
        match self {
            ReplyProducer::Generative(_) => "ai",
            ReplyProducer::TemplateOnly => "template",
        }
    }

    /// Reply for `/mode`. Depends only on configuration.
    pub fn mode_status(&self) -> String {
        match self {
            ReplyProducer::Generative(client) => {
                format!("Mode: AI enabled (model: {}).", client.model())
            }
            ReplyProducer::TemplateOnly => "Mode: Template-only (AI disabled / no key).".to_string(),
        }
    }
}
