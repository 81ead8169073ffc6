//! Command resolver: classify inbound text and produce the reply.
//!
//! Matching is a case-insensitive prefix test against an ordered vocabulary; the first
//! binding that matches wins. Anything else is freeform.

use crate::llm::ReplyProducer;
use crate::prompts;
use crate::templates::{Category, TemplateStore};
use serde::{Deserialize, Serialize};

/// Reply for freeform text when no generative backend is configured.
pub const FREEFORM_FALLBACK: &str = "I'm online. Use /anime /gaming /psychology /strategy or /help.";

/// One entry of the command vocabulary: text starting with `prefix` maps to `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBinding {
    pub prefix: String,
    pub category: Category,
}

impl CommandBinding {
    pub fn new(prefix: impl Into<String>, category: Category) -> Self {
        Self {
            prefix: prefix.into(),
            category,
        }
    }
}

/// Built-in vocabulary. Order is significant.
pub fn default_commands() -> Vec<CommandBinding> {
    vec![
        CommandBinding::new("/start", Category::Help),
        CommandBinding::new("/help", Category::Help),
        CommandBinding::new("/mode", Category::Mode),
        CommandBinding::new("/anime", Category::Anime),
        CommandBinding::new("/gaming", Category::Gaming),
        CommandBinding::new("/psychology", Category::Psychology),
        CommandBinding::new("/strategy", Category::Strategy),
    ]
}

/// Classifies text and resolves replies with the configured producer.
#[derive(Clone)]
pub struct CommandResolver {
    commands: Vec<CommandBinding>,
    templates: TemplateStore,
    producer: ReplyProducer,
}

impl CommandResolver {
    /// Bindings with blank prefixes or a `freeform` category are dropped; prefixes are lowercased.
    pub fn new(
        commands: Vec<CommandBinding>,
        templates: TemplateStore,
        producer: ReplyProducer,
    ) -> Self {
        let commands = commands
            .into_iter()
            .filter_map(|b| {
                let prefix = b.prefix.trim().to_lowercase();
                if prefix.is_empty() || b.category == Category::Freeform {
                    log::warn!("commands: ignoring binding {:?}", b);
                    return None;
                }
                Some(CommandBinding::new(prefix, b.category))
            })
            .collect();
        Self {
            commands,
            templates,
            producer,
        }
    }

    pub fn producer(&self) -> &ReplyProducer {
        &self.producer
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Category for `text`. Empty or whitespace-only text is freeform.
    pub fn classify(&self, text: &str) -> Category {
        let low = text.trim().to_lowercase();
        if low.is_empty() {
            return Category::Freeform;
        }
        self.commands
            .iter()
            .find(|b| low.starts_with(&b.prefix))
            .map(|b| b.category)
            .unwrap_or(Category::Freeform)
    }

    /// Reply text for `text`. Always non-empty.
    pub async fn resolve(&self, text: &str) -> String {
        let category = self.classify(text);
        log::debug!("commands: resolved category {}", category.name());
        match category {
            Category::Mode => self.producer.mode_status(),
            Category::Help => self.templates.first(Category::Help).to_string(),
            Category::Freeform => self.resolve_freeform(text.trim()).await,
            themed => self.resolve_themed(themed).await,
        }
    }

    async fn resolve_themed(&self, category: Category) -> String {
        match (&self.producer, prompts::category_prompt(category)) {
            (ReplyProducer::Generative(client), Some(prompt)) => {
                client.generate(prompts::PERSONA, prompt).await
            }
            _ => self.templates.pick(category).to_string(),
        }
    }

    async fn resolve_freeform(&self, text: &str) -> String {
        match &self.producer {
            ReplyProducer::Generative(client) if !text.is_empty() => {
                client
                    .generate(prompts::PERSONA, &prompts::freeform_prompt(text))
                    .await
            }
            _ => FREEFORM_FALLBACK.to_string(),
        }
    }
}
