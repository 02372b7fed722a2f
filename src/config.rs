use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_region: String,
    pub tmdb_languages: String,
    pub tmdb_max_retries: u32,
    pub tmdb_backoff_ms: u64,
    pub http_timeout_secs: u64,
    pub sync_delay_ms: u64,
    pub assist_api_key: String,
    pub assist_base_url: String,
    pub assist_primary_model: String,
    pub assist_fallback_model: String,
    pub assist_window_minutes: i64,
    pub assist_request_limit: u64,
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            tmdb_api_key: "test-key".to_string(),
            tmdb_base_url: "http://127.0.0.1:9".to_string(),
            tmdb_region: "IN".to_string(),
            tmdb_languages: "hi|te".to_string(),
            tmdb_max_retries: 3,
            tmdb_backoff_ms: 1,
            http_timeout_secs: 5,
            sync_delay_ms: 0,
            assist_api_key: "test-key".to_string(),
            assist_base_url: "http://127.0.0.1:9".to_string(),
            assist_primary_model: "primary".to_string(),
            assist_fallback_model: "fallback".to_string(),
            assist_window_minutes: 10,
            assist_request_limit: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinemeter.db?mode=rwc".to_string());

        let tmdb_api_key = std::env::var("TMDB_API_KEY").unwrap_or_else(|_| "".to_string());
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_region = std::env::var("TMDB_REGION").unwrap_or_else(|_| "IN".to_string());
        let tmdb_languages =
            std::env::var("TMDB_LANGUAGES").unwrap_or_else(|_| "hi|te|ta|ml|kn".to_string());

        let tmdb_max_retries: u32 =
            std::env::var("TMDB_MAX_RETRIES").ok().and_then(|s| s.parse().ok()).unwrap_or(5);
        let tmdb_backoff_ms: u64 =
            std::env::var("TMDB_BACKOFF_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(1500);

        let http_timeout_secs: u64 =
            std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(20);

        let sync_delay_ms: u64 =
            std::env::var("SYNC_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(800);

        let assist_api_key = std::env::var("GROQ_API_KEY").unwrap_or_else(|_| "".to_string());
        let assist_base_url = std::env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1/chat/completions".to_string());
        let assist_primary_model = std::env::var("GROQ_MODEL_PRIMARY")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
        let assist_fallback_model = std::env::var("GROQ_MODEL_FALLBACK")
            .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string());

        let assist_window_minutes: i64 =
            std::env::var("ASSIST_WINDOW_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(10);
        let assist_request_limit: u64 =
            std::env::var("ASSIST_REQUEST_LIMIT").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_region,
            tmdb_languages,
            tmdb_max_retries,
            tmdb_backoff_ms,
            http_timeout_secs,
            sync_delay_ms,
            assist_api_key,
            assist_base_url,
            assist_primary_model,
            assist_fallback_model,
            assist_window_minutes,
            assist_request_limit,
        })
    }
}
