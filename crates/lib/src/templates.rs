//! Template store: category name -> ordered pool of pre-authored replies.
//!
//! Read-only after construction. Used whenever the generative backend is not configured.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classification bucket for inbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Anime,
    Gaming,
    Psychology,
    Strategy,
    Help,
    Mode,
    Freeform,
}

impl Category {
    /// Categories whose reply is themed content (generated or picked from a pool).
    pub const THEMED: [Category; 4] = [
        Category::Anime,
        Category::Gaming,
        Category::Psychology,
        Category::Strategy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Anime => "anime",
            Category::Gaming => "gaming",
            Category::Psychology => "psychology",
            Category::Strategy => "strategy",
            Category::Help => "help",
            Category::Mode => "mode",
            Category::Freeform => "freeform",
        }
    }
}

/// Returned by [`TemplateStore::pick`] when a category has no pool.
pub const NO_TEMPLATES: &str = "No templates found.";

const HELP_TEXT: &str = "Commands:\n\
/anime - short anime-themed post\n\
/gaming - short gaming-themed post\n\
/psychology - mindset and behavior post\n\
/strategy - planning and decision post\n\
/mode - shows whether AI is enabled\n\
Send any message for a short reply.";

/// Immutable category -> replies mapping.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    pools: HashMap<Category, Vec<String>>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        let mut pools = HashMap::new();
        pools.insert(
            Category::Anime,
            owned(&[
                "Quiet power: train one small skill today. No audience needed.",
                "Your rival is yesterday's you. Beat them quietly.",
                "If the arc feels slow, good. That's the training montage.",
                "Discipline is a superpower. Stack one rep. Stack one page.",
                "The boss fight is your habits. Grind in silence.",
            ]),
        );
        pools.insert(
            Category::Gaming,
            owned(&[
                "Optimize your build: one weakness at a time. Patch notes daily.",
                "Play the long game: XP comes from consistency, not hype.",
                "Stop chasing loot. Upgrade your fundamentals: sleep, food, movement.",
                "Your meta is focus. Your combo is routine plus repetition.",
                "Don't tilt. Re-center. One clean decision at a time.",
            ]),
        );
        pools.insert(
            Category::Psychology,
            owned(&[
                "Name the emotion, then choose the action. Feeling isn't fate.",
                "Your brain learns what you repeat. Repeat the useful patterns.",
                "Small wins rewire confidence. Collect them daily.",
                "Protect your attention like it's currency, because it is.",
                "Calm is a skill. Practice it like strength training.",
            ]),
        );
        pools.insert(
            Category::Strategy,
            owned(&[
                "Clarify the objective. Remove everything that doesn't serve it.",
                "Good strategy is subtraction: fewer moves, sharper impact.",
                "Win quietly: prepare more than you announce.",
                "Measure what matters weekly. Adjust without drama.",
                "If it's not scheduled, it's not real. Put it on the board.",
            ]),
        );
        pools.insert(Category::Help, owned(&[HELP_TEXT]));
        Self { pools }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TemplateStore {
    /// Built-in pools with per-category overrides applied. Empty or blank-only overrides are ignored
    /// so every category keeps at least one entry.
    pub fn with_overrides(overrides: &HashMap<Category, Vec<String>>) -> Self {
        let mut store = Self::default();
        for (category, items) in overrides {
            let items: Vec<String> = items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if items.is_empty() {
                log::warn!(
                    "templates: ignoring empty override for category {}",
                    category.name()
                );
                continue;
            }
            store.pools.insert(*category, items);
        }
        store
    }

    /// All replies for a category, in order. Empty slice when the category has no pool.
    pub fn pool(&self, category: Category) -> &[String] {
        self.pools
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First entry of the pool (used for single-entry categories such as help).
    pub fn first(&self, category: Category) -> &str {
        self.pool(category)
            .first()
            .map(String::as_str)
            .unwrap_or(NO_TEMPLATES)
    }

    /// One entry chosen uniformly at random.
    pub fn pick(&self, category: Category) -> &str {
        self.pool(category)
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(NO_TEMPLATES)
    }
}
