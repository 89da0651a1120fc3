use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::generator::ProviderSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Interface the HTTP server binds to
    /// Default: 127.0.0.1
    pub host: String,

    /// Default: 8000
    pub port: u16,

    /// Maximum payload size for all requests (in bytes)
    /// Default: 10MB (10 * 1024 * 1024)
    pub max_payload_size: usize,

    /// Words processed at once across every running batch
    /// Default: 4
    pub max_concurrent_items: usize,

    /// Time budget for a single word before it is recorded as a failure
    pub item_timeout: Duration,

    /// How long finished jobs stay readable
    pub job_retention: Duration,

    /// How often the retention sweeper runs
    pub retention_sweep_interval: Duration,

    /// Where generated decks are written
    pub output_dir: PathBuf,

    /// Directory for the rotating log files
    pub log_dir: String,

    /// Origin allowed to call the API from a browser
    pub cors_origin: String,

    pub ollama_url: String,
    pub openrouter_url: String,
    pub openrouter_api_key: Option<String>,

    /// Timeout applied to every language-model request
    pub llm_timeout: Duration,

    /// How long shutdown waits for running batches
    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional. Values that fail to parse fall back to the default.
    /// - HOST, PORT: bind address (default: 127.0.0.1:8000)
    /// - MAX_PAYLOAD_SIZE: Maximum request payload size in bytes (default: 10485760 = 10MB)
    /// - MAX_CONCURRENT_ITEMS: Words in flight across all jobs (default: 4)
    /// - ITEM_TIMEOUT_SECS: Per-word budget (default: 120, must not be 0)
    /// - JOB_RETENTION_SECS / RETENTION_SWEEP_SECS: Eviction of finished jobs (default: 3600 / 60, sweep must not be 0)
    /// - OUTPUT_DIR: Deck storage (default: generated_presentations)
    /// - LOG_DIR: Log files (default: logs)
    /// - CORS_ORIGIN: Browser origin (default: http://localhost:5173)
    /// - OLLAMA_URL, OPENROUTER_URL, OPENROUTER_API_KEY: Provider endpoints
    /// - LLM_TIMEOUT_SECS: Provider request timeout (default: 60)
    /// - SHUTDOWN_GRACE_SECS: Drain window on shutdown (default: 30)
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default| parse_or(lookup(key), default);
        let seconds = |key: &str, default| Duration::from_secs(parse_or(lookup(key), default));

        let max_concurrent_items = number("MAX_CONCURRENT_ITEMS", 4);
        if max_concurrent_items == 0 {
            return Err("MAX_CONCURRENT_ITEMS must be at least 1".to_string());
        }
        let item_timeout = seconds("ITEM_TIMEOUT_SECS", 120);
        if item_timeout.is_zero() {
            return Err("ITEM_TIMEOUT_SECS must be at least 1".to_string());
        }
        // Zero would busy-loop the sweeper
        let retention_sweep_interval = seconds("RETENTION_SWEEP_SECS", 60);
        if retention_sweep_interval.is_zero() {
            return Err("RETENTION_SWEEP_SECS must be at least 1".to_string());
        }

        Ok(Config {
            host: text("HOST", "127.0.0.1"),
            port: parse_or(lookup("PORT"), 8000),
            max_payload_size: number("MAX_PAYLOAD_SIZE", 10 * 1024 * 1024),
            max_concurrent_items,
            item_timeout,
            job_retention: seconds("JOB_RETENTION_SECS", 3600),
            retention_sweep_interval,
            output_dir: PathBuf::from(text("OUTPUT_DIR", "generated_presentations")),
            log_dir: text("LOG_DIR", "logs"),
            cors_origin: text("CORS_ORIGIN", "http://localhost:5173"),
            ollama_url: text("OLLAMA_URL", "http://localhost:11434"),
            openrouter_url: text("OPENROUTER_URL", "https://openrouter.ai/api/v1"),
            openrouter_api_key: lookup("OPENROUTER_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            llm_timeout: seconds("LLM_TIMEOUT_SECS", 60),
            shutdown_grace: seconds("SHUTDOWN_GRACE_SECS", 30),
        })
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            ollama_url: self.ollama_url.clone(),
            openrouter_url: self.openrouter_url.clone(),
            openrouter_api_key: self.openrouter_api_key.clone(),
            request_timeout: self.llm_timeout,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_payload_size, 10 * 1024 * 1024);
        assert_eq!(config.max_concurrent_items, 4);
        assert_eq!(config.item_timeout, Duration::from_secs(120));
        assert_eq!(config.job_retention, Duration::from_secs(3600));
        assert_eq!(config.output_dir, PathBuf::from("generated_presentations"));
        assert_eq!(config.openrouter_api_key, None);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = load(&[("PORT", "eighty"), ("ITEM_TIMEOUT_SECS", "-1"), ("MAX_CONCURRENT_ITEMS", " 8 ")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.item_timeout, Duration::from_secs(120));
        assert_eq!(config.max_concurrent_items, 8);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(load(&[("MAX_CONCURRENT_ITEMS", "0")]).is_err());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let err = load(&[("ITEM_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.contains("ITEM_TIMEOUT_SECS"));

        let err = load(&[("RETENTION_SWEEP_SECS", "0")]).unwrap_err();
        assert!(err.contains("RETENTION_SWEEP_SECS"));

        assert!(load(&[("JOB_RETENTION_SECS", "0")]).is_ok());
    }

    #[test]
    fn provider_settings_carry_key_and_timeout() {
        let config = load(&[("OPENROUTER_API_KEY", "sk-test"), ("LLM_TIMEOUT_SECS", "5")]).unwrap();
        let settings = config.provider_settings();
        assert_eq!(settings.openrouter_api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.ollama_url, "http://localhost:11434");
    }
}
