use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use web_summarizer::{AppState, api::routes::create_router, config::Config, summarizer::Summarizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let summarizer = Summarizer::from_config(&config);
    if !summarizer.is_configured() {
        warn!("GEMINI_API_KEY is not set; summarize requests will fail with 503");
    }

    // Create application state
    let app_state = AppState {
        config: Arc::new(config),
        summarizer: Arc::new(summarizer),
    };

    // Build the router with routes
    let app = create_router(app_state);

    // Create the listener
    let listener = TcpListener::bind(server_addr).await?;

    // Start the server
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
