use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;
use tutor_api::completions::OpenAiCompletions;
use tutor_api::config::Config;
use tutor_api::routes::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    // A missing OPENAI_API_KEY stops the process here, before anything binds.
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting language tutor relay...");

    // --- 3. Initialize API Clients ---
    let completions = Arc::new(OpenAiCompletions::new(
        config.openai_api_key,
        config.chat_model.clone(),
        &config.openai_base_url,
    ));
    tracing::info!(model = %config.chat_model, "Using chat completions model");

    // --- 4. Build Router ---
    if !config.static_dir.join("index.html").is_file() {
        tracing::warn!(
            "No index.html found in {}; only /api/chat will be useful",
            config.static_dir.display()
        );
    }
    let app = build_router(AppState { completions }, &config.static_dir);

    // --- 5. Serve ---
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Language tutor relay listening on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
