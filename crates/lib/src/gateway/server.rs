//! Gateway HTTP server (single port).

use crate::channels::{ChannelHandle, TelegramChannel};
use crate::commands::{default_commands, CommandResolver};
use crate::config::{self, Config};
use crate::gateway::webhook::WebhookHandler;
use crate::llm::ReplyProducer;
use crate::rate_limit::{self, RateLimiter};
use crate::templates::TemplateStore;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shared state for the HTTP routes.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub handler: WebhookHandler,
}

/// Components resolved once from configuration.
pub struct Components {
    pub telegram: Arc<TelegramChannel>,
    pub resolver: Arc<CommandResolver>,
    pub rate_limiter: RateLimiter,
}

/// Resolve credentials and build the telegram channel, resolver, and rate limiter.
pub fn build_components(config: &Config) -> Components {
    let telegram = Arc::new(TelegramChannel::new(
        &config.channels.telegram,
        config::resolve_telegram_token(config),
    ));
    let producer = ReplyProducer::from_config(config);
    let templates = TemplateStore::with_overrides(&config.templates);
    let commands = config.commands.clone().unwrap_or_else(default_commands);
    let resolver = Arc::new(CommandResolver::new(commands, templates, producer));
    let rate_limiter = RateLimiter::from_config(&config.rate_limit);
    Components {
        telegram,
        resolver,
        rate_limiter,
    }
}

/// Routes: `GET /` liveness and `POST {webhook_path}`.
pub fn router(state: GatewayState) -> Router {
    let webhook_path = normalize_path(&state.config.gateway.webhook_path);
    Router::new()
        .route("/", get(health_http))
        .route(&webhook_path, post(telegram_webhook))
        .with_state(state)
}

fn normalize_path(path: &str) -> String {
    let p = path.trim();
    if p.is_empty() || p == "/" {
        "/webhook".to_string()
    } else if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{}", p)
    }
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let components = build_components(&config);
    let producer = components.resolver.producer();
    log::info!(
        "reply mode: {} ({})",
        producer.mode_name(),
        producer.mode_status()
    );
    if !components.telegram.is_configured() {
        log::warn!("TELEGRAM_BOT_TOKEN not set; replies will be dropped");
    }
    log::info!(
        "rate limit: {}s between replies per conversation",
        components.rate_limiter.min_interval()
    );

    let sweep_task = spawn_sweep(
        components.rate_limiter.clone(),
        config.rate_limit.sweep_interval_secs,
    );

    let webhook_registered = match config.channels.telegram.webhook_url.as_deref() {
        Some(url) if components.telegram.is_configured() => {
            match components.telegram.set_webhook(url).await {
                Ok(()) => {
                    log::info!("telegram webhook registered: {}", url);
                    true
                }
                Err(e) => {
                    log::warn!("telegram set_webhook failed: {}", e);
                    false
                }
            }
        }
        _ => false,
    };

    let channel: Arc<dyn ChannelHandle> = components.telegram.clone();
    log::debug!("delivering replies via channel {}", channel.id());
    let handler = WebhookHandler::new(components.rate_limiter, components.resolver, channel);
    let state = GatewayState {
        config: Arc::new(config.clone()),
        handler,
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!(
        "gateway listening on {} (webhook {})",
        bind_addr,
        normalize_path(&config.gateway.webhook_path)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;

    sweep_task.abort();
    if webhook_registered {
        if let Err(e) = components.telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }
    log::info!("gateway stopped");
    Ok(())
}

/// Periodically evict idle rate-limit entries.
fn spawn_sweep(rate_limiter: RateLimiter, interval_secs: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = rate_limiter.sweep(rate_limit::now_secs()).await;
            if removed > 0 {
                log::debug!("rate limit sweep evicted {} conversation(s)", removed);
            }
        }
    })
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST {webhook_path} — receives Telegram update JSON. Always 200 OK.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let _outcome = state.handler.handle(&body).await;
    (StatusCode::OK, "OK")
}

/// GET / returns a simple health JSON (liveness check).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "mode": state.handler.resolver().producer().mode_name(),
        "port": state.config.gateway.port,
    }))
}
