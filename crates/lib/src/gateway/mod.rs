//! Gateway: HTTP server for the platform webhook.
//!
//! Single port serves the liveness route and the webhook route. The webhook always answers
//! `200 OK`; see [`WebhookHandler`] for what happens behind it.

mod server;
mod webhook;

pub use server::{build_components, router, run_gateway, Components, GatewayState};
pub use webhook::{WebhookHandler, WebhookOutcome};
