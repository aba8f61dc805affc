use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bedrock_chat::config::Config;
use bedrock_chat::services::BedrockClient;
use bedrock_chat::state::AppState;
use bedrock_chat::web;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bedrock_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bedrock chat bridge");

    // Configuration is read once and immutable afterwards
    let config = Config::from_env()?;
    tracing::info!(model = %config.model_id, region = %config.region, "Configuration loaded");

    let model = Arc::new(BedrockClient::new(&config));
    let state = AppState::new(config, model);

    web::start_server(state).await?;

    Ok(())
}
