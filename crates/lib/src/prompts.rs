//! Persona instruction and per-category generation prompts sent to the generative backend.

use crate::templates::Category;

/// Style instruction sent with every generative request.
pub const PERSONA: &str = "You are 'The Quiet Optimizer': calm, strategic, supportive. \
Keep replies short. No hashtags. No emojis unless the user used them.";

/// Instruction prompt for a themed category. `None` for categories that are never generated.
pub fn category_prompt(category: Category) -> Option<&'static str> {
    let prompt = match category {
        Category::Anime => {
            "Write 3 short posts for a brand called 'The Quiet Optimizer'. \
             Theme: anime. Tone: calm, strategic, motivational. \
             Each post 1-2 sentences. No hashtags."
        }
        Category::Gaming => {
            "Write 3 short posts for 'The Quiet Optimizer'. \
             Theme: gaming discipline and improvement. Tone: calm, strategic. \
             Each post 1-2 sentences. No hashtags."
        }
        Category::Psychology => {
            "Write 3 short posts for 'The Quiet Optimizer'. \
             Theme: psychology (habits, focus, resilience). Tone: calm, practical. \
             Each post 1-2 sentences. No hashtags."
        }
        Category::Strategy => {
            "Write 3 short posts for 'The Quiet Optimizer'. \
             Theme: strategy and decision-making. Tone: calm, sharp. \
             Each post 1-2 sentences. No hashtags."
        }
        Category::Help | Category::Mode | Category::Freeform => return None,
    };
    Some(prompt)
}

/// Wrap a freeform user message for a short conversational reply.
pub fn freeform_prompt(user_text: &str) -> String {
    format!("Reply in 1-2 sentences.\n\nUser message: {}", user_text)
}
