use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-001";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process-wide configuration, built once at startup and injected into the
/// handlers through `AppState`. The Gemini key is optional: a missing key
/// keeps the server up but makes every summarize request fail with 503.
#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
    pub gemini_model: String,
    pub model_temperature: f32,
    pub fetch_timeout: Duration,
    pub model_timeout: Duration,
    /// Maximum number of characters of page text embedded in the prompt.
    pub max_prompt_chars: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let gemini_endpoint = env::var("GEMINI_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_GEMINI_ENDPOINT.to_string());
        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        let model_temperature = parse_var("MODEL_TEMPERATURE", 0.2_f32)?;
        let fetch_timeout = Duration::from_secs(parse_var("FETCH_TIMEOUT_SECS", 30_u64)?);
        let model_timeout = Duration::from_secs(parse_var("MODEL_TIMEOUT_SECS", 120_u64)?);
        let max_prompt_chars = parse_var("MAX_PROMPT_CHARS", 32_000_usize)?;

        // Server address with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port.parse::<u16>().map_err(|e| ConfigError::Invalid {
            name: "PORT",
            reason: e.to_string(),
        })?;
        let ip = IpAddr::from_str(&host).map_err(|e| ConfigError::Invalid {
            name: "HOST",
            reason: e.to_string(),
        })?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            gemini_api_key,
            gemini_endpoint,
            gemini_model,
            model_temperature,
            fetch_timeout,
            model_timeout,
            max_prompt_chars,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
