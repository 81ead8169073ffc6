//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.quiet/config.json`) and environment.
//! Environment variables override the file for credentials and the few knobs a
//! hosting platform usually sets (port, model, throttle).

use crate::commands::CommandBinding;
use crate::templates::Category;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging platform settings.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Generative backend settings. No api key => template-only mode.
    #[serde(default)]
    pub generative: GenerativeConfig,

    /// Per-conversation reply throttle.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Ordered command vocabulary. When absent the built-in list is used.
    #[serde(default)]
    pub commands: Option<Vec<CommandBinding>>,

    /// Per-category template pool overrides.
    #[serde(default)]
    pub templates: HashMap<Category, Vec<String>>,
}

/// Server bind, port, and webhook route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Listening port (default 10000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must be able to reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Route the platform POSTs updates to (default "/webhook").
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_gateway_port() -> u16 {
    10000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            webhook_path: default_webhook_path(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API base URL (default https://api.telegram.org).
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Bot API request timeout in seconds; clamped to 5..=60 (default 20).
    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,
    /// Public URL of this server's webhook route. When set, it is registered with setWebhook at
    /// startup and removed at shutdown.
    pub webhook_url: Option<String>,
}

pub const TELEGRAM_TIMEOUT_MIN_SECS: u64 = 5;
pub const TELEGRAM_TIMEOUT_MAX_SECS: u64 = 60;

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> u64 {
    20
}

impl Default for TelegramChannelConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api_base(),
            timeout_secs: default_telegram_timeout(),
            webhook_url: None,
        }
    }
}

impl TelegramChannelConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs
            .clamp(TELEGRAM_TIMEOUT_MIN_SECS, TELEGRAM_TIMEOUT_MAX_SECS)
    }
}

/// Generative backend (OpenAI Responses API) config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerativeConfig {
    /// API key. Overridden by OPENAI_API_KEY env. Absent => template-only mode.
    pub api_key: Option<String>,
    /// Model identifier (default "gpt-4o-mini"). Overridden by OPENAI_MODEL env.
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL including the version segment (default https://api.openai.com/v1).
    #[serde(default = "default_generative_base_url")]
    pub base_url: String,
    /// Request timeout in seconds; clamped to 20..=60 (default 30).
    #[serde(default = "default_generative_timeout")]
    pub timeout_secs: u64,
}

pub const GENERATIVE_TIMEOUT_MIN_SECS: u64 = 20;
pub const GENERATIVE_TIMEOUT_MAX_SECS: u64 = 60;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generative_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generative_timeout() -> u64 {
    30
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_generative_base_url(),
            timeout_secs: default_generative_timeout(),
        }
    }
}

impl GenerativeConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs
            .clamp(GENERATIVE_TIMEOUT_MIN_SECS, GENERATIVE_TIMEOUT_MAX_SECS)
    }
}

/// Rate limiter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Minimum seconds between accepted messages per conversation (default 3).
    /// Overridden by MIN_SECONDS_BETWEEN_MESSAGES env.
    #[serde(default = "default_min_seconds")]
    pub min_seconds_between_messages: u64,
    /// Entries idle for this many intervals are evicted by the sweep (default 10, minimum 1).
    #[serde(default = "default_evict_after_intervals")]
    pub evict_after_intervals: u64,
    /// How often the background sweep runs, in seconds (default 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_min_seconds() -> u64 {
    3
}

fn default_evict_after_intervals() -> u64 {
    10
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_seconds_between_messages: default_min_seconds(),
            evict_after_intervals: default_evict_after_intervals(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Trimmed, non-empty env var value.
fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn trimmed_nonempty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_nonempty("TELEGRAM_BOT_TOKEN")
        .or_else(|| trimmed_nonempty(config.channels.telegram.bot_token.as_ref()))
}

/// Resolve the generative api key: env OPENAI_API_KEY overrides config.
pub fn resolve_generative_key(config: &Config) -> Option<String> {
    env_nonempty("OPENAI_API_KEY")
        .or_else(|| trimmed_nonempty(config.generative.api_key.as_ref()))
}

/// Apply the non-secret env overrides (PORT, OPENAI_MODEL, MIN_SECONDS_BETWEEN_MESSAGES).
/// Unparsable numeric values are logged and ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(port) = env_nonempty("PORT") {
        match port.parse::<u16>() {
            Ok(p) => config.gateway.port = p,
            Err(_) => log::warn!("ignoring invalid PORT value: {}", port),
        }
    }
    if let Some(model) = env_nonempty("OPENAI_MODEL") {
        config.generative.model = model;
    }
    if let Some(secs) = env_nonempty("MIN_SECONDS_BETWEEN_MESSAGES") {
        match secs.parse::<u64>() {
            Ok(s) => config.rate_limit.min_seconds_between_messages = s,
            Err(_) => log::warn!("ignoring invalid MIN_SECONDS_BETWEEN_MESSAGES value: {}", secs),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("QUIET_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".quiet").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Env overrides are applied on top. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config);
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.gateway.port, 10000);
        assert_eq!(c.gateway.bind, "0.0.0.0");
        assert_eq!(c.gateway.webhook_path, "/webhook");
        assert_eq!(c.channels.telegram.timeout_secs, 20);
        assert_eq!(c.generative.model, "gpt-4o-mini");
        assert_eq!(c.rate_limit.min_seconds_between_messages, 3);
        assert!(c.commands.is_none());
    }

    #[test]
    fn parses_camel_case_file_with_partial_sections() {
        let json = r#"{
            "gateway": { "port": 8080 },
            "generative": { "apiKey": "  sk-test  ", "timeoutSecs": 5 },
            "rateLimit": { "minSecondsBetweenMessages": 2 },
            "commands": [ { "prefix": "/psy", "category": "psychology" } ],
            "templates": { "anime": ["a"] }
        }"#;
        let c: Config = serde_json::from_str(json).expect("parse");
        assert_eq!(c.gateway.port, 8080);
        assert_eq!(c.gateway.bind, "0.0.0.0");
        assert_eq!(c.generative.api_key.as_deref(), Some("  sk-test  "));
        assert_eq!(c.generative.model, "gpt-4o-mini");
        assert_eq!(c.rate_limit.min_seconds_between_messages, 2);
        assert_eq!(c.rate_limit.evict_after_intervals, 10);
        let commands = c.commands.expect("commands");
        assert_eq!(commands[0].prefix, "/psy");
        assert_eq!(commands[0].category, Category::Psychology);
        assert_eq!(c.templates.get(&Category::Anime).map(Vec::len), Some(1));
    }

    #[test]
    fn generative_timeout_is_clamped() {
        let mut g = GenerativeConfig::default();
        assert_eq!(g.effective_timeout_secs(), 30);
        g.timeout_secs = 5;
        assert_eq!(g.effective_timeout_secs(), 20);
        g.timeout_secs = 600;
        assert_eq!(g.effective_timeout_secs(), 60);
    }

    #[test]
    fn telegram_timeout_is_clamped() {
        let mut t = TelegramChannelConfig::default();
        assert_eq!(t.effective_timeout_secs(), 20);
        t.timeout_secs = 0;
        assert_eq!(t.effective_timeout_secs(), 5);
        t.timeout_secs = u64::MAX;
        assert_eq!(t.effective_timeout_secs(), 60);
    }

    #[test]
    fn blank_config_key_is_treated_as_absent() {
        assert_eq!(trimmed_nonempty(Some(&"   ".to_string())), None);
        assert_eq!(
            trimmed_nonempty(Some(&" sk ".to_string())),
            Some("sk".to_string())
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("quiet-missing-{}.json", uuid::Uuid::new_v4()));
        let (c, used) = load_config(Some(path.clone())).expect("load");
        assert_eq!(used, path);
        assert_eq!(c.gateway.webhook_path, "/webhook");
    }
}
