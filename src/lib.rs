pub mod api;
pub mod config;
pub mod crawler;
pub mod error;
pub mod summarizer;

use std::sync::Arc;

use config::Config;
use summarizer::Summarizer;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub summarizer: Arc<Summarizer>,
}
