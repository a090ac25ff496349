mod commands;
mod config;
mod dispatcher;
mod llm;
mod platform;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::llm::GeminiClient;
use crate::platform::telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lina_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.gemini.model);
    info!("  Generation timeout: {}s", config.gemini.timeout_secs);
    info!("  Bind address: {}", config.server.bind_address);

    let messenger = Arc::new(TelegramMessenger::new(&config.telegram.bot_token));
    let generator = Arc::new(GeminiClient::new(config.gemini.clone())?);

    if let Some(url) = &config.telegram.webhook_url {
        if let Err(e) = messenger.set_webhook(url).await {
            warn!("Webhook registration failed: {:#}", e);
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(messenger, generator));

    info!("Bot is starting...");
    server::serve(&config.server.bind_address, dispatcher).await?;

    Ok(())
}
