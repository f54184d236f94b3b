mod bot;
mod config;
mod server;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

use bot::{Dispatcher, LineClient, ModelSettings, OpenAiClient, SqliteStore, UsageGuard};
use config::Config;
use server::AppState;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "eikaiwa.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "eikaiwa.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting eikaiwa-bot...");
    info!("Loaded config from {config_path}");
    info!(
        "Model {} (max_tokens {}), {} call(s) per user per day",
        config.model, config.max_tokens, config.daily_call_limit
    );

    let store = match SqliteStore::open(&config.database_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let completion = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        ModelSettings {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        },
    ));
    let line = Arc::new(LineClient::new(config.line_channel_access_token.clone()));

    let dispatcher = Dispatcher::new(
        store,
        completion,
        line,
        UsageGuard::new(config.daily_call_limit),
        config.history_limit,
    );
    let app = server::router(AppState { dispatcher: Arc::new(dispatcher) });

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {e}", config.listen_addr);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
    }
}
