//! Quiet Optimizer core library: webhook handling, command resolution, per-conversation
//! rate limiting, and the messaging and generative clients, shared by the CLI.

pub mod channels;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod init;
pub mod llm;
pub mod prompts;
pub mod rate_limit;
pub mod templates;
