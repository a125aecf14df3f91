//! Brand News Digest runner
//!
//! Polls Google News for the configured brand queries, drops Korean and
//! already-delivered coverage, and sends the digest to Telegram. Meant to
//! be invoked once per interval by an external scheduler.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use digest_core::DigestError;
use digest_news::{GoogleNewsClient, HangulDetector, TelegramNotifier};
use digest_services::{DigestConfig, DigestService, TelegramConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,digest_bot=debug")),
        )
        .init();

    info!("Starting Brand News Digest run");

    let config = DigestConfig::from_env().context("Failed to load digest configuration")?;
    let telegram = TelegramConfig::from_env().context("Failed to load Telegram configuration")?;

    let notifier = TelegramNotifier::new(telegram.bot_token, telegram.chat_id)
        .context("Failed to initialize Telegram notifier")?;

    let service = DigestService::new(
        config,
        Arc::new(GoogleNewsClient::new()),
        Arc::new(notifier),
        Arc::new(HangulDetector::new()),
    )?;

    match service.run_once(Utc::now()).await {
        Ok(report) => {
            info!(
                "Delivered {} new article(s); {} queries failed",
                report.delivered,
                report.failed_queries.len()
            );
            Ok(())
        }
        Err(e) => {
            let err = DigestError::from(e);
            if err.is_transient() {
                error!("Run failed, will retry on the next schedule: {}", err);
            } else {
                error!("Run failed: {}", err);
            }
            Err(err.into())
        }
    }
}
