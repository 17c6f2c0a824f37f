//! Configuration and settings management
//!
//! Loads settings from environment variables and defines transport constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_token: String,

    /// Search API token, sent in every request body
    #[serde(default)]
    pub api_token: String,

    /// Search API endpoint URL
    #[serde(default)]
    pub api_url: String,

    /// Maximum number of records requested per query
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Response language code requested from the search API
    #[serde(rename = "search_lang", default = "default_lang")]
    pub lang: String,

    /// Optional HTML file prepended to downloadable HTML reports
    pub html_preamble_path: Option<PathBuf>,

    /// Seconds a built report stays available for navigation
    #[serde(default = "default_report_cache_ttl")]
    pub report_cache_ttl_secs: u64,

    /// Maximum number of reports kept in memory
    #[serde(default = "default_report_cache_max_size")]
    pub report_cache_max_size: u64,

    /// Timeout for a single search API request
    #[serde(default = "default_search_http_timeout")]
    pub search_http_timeout_secs: u64,
}

const fn default_limit() -> u32 {
    100
}

fn default_lang() -> String {
    "en".to_string()
}

const fn default_report_cache_ttl() -> u64 {
    REPORT_CACHE_TTL_SECS
}

const fn default_report_cache_max_size() -> u64 {
    REPORT_CACHE_MAX_SIZE
}

const fn default_search_http_timeout() -> u64 {
    SEARCH_HTTP_TIMEOUT_SECS
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use breach_lookup_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP_LIMIT=50 ./target/app` would set the `limit` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case,
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Older deployments set BOT_TOKEN instead of TELEGRAM_TOKEN
        if settings.telegram_token.is_empty() {
            if let Ok(val) = std::env::var("BOT_TOKEN") {
                if !val.is_empty() {
                    settings.telegram_token = val;
                }
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&str> = [
            ("TELEGRAM_TOKEN", self.telegram_token.as_str()),
            ("API_TOKEN", self.api_token.as_str()),
            ("API_URL", self.api_url.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// Reads the configured HTML preamble, if any.
    ///
    /// A missing or unreadable file is logged and treated as "no preamble",
    /// which makes downloads fall back to plain text.
    #[must_use]
    pub fn load_html_preamble(&self) -> Option<String> {
        let path = self.html_preamble_path.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(
                    "Failed to read HTML preamble from {}: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Maximum characters of a page shown in a Telegram message.
/// Telegram's limit is 4096; the remainder is reserved for markup.
pub const PAGE_CHAR_LIMIT: usize = 3500;

/// Default time-to-live (seconds) of a cached report. Default: 24 hours.
pub const REPORT_CACHE_TTL_SECS: u64 = 86_400;
/// Default maximum number of cached reports.
pub const REPORT_CACHE_MAX_SIZE: u64 = 10_000;
/// Default timeout (seconds) for a search API request.
pub const SEARCH_HTTP_TIMEOUT_SECS: u64 = 30;

/// Initial backoff for retried Telegram API calls
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound of the backoff between Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Attempts made for a Telegram API call before giving up
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for key in [
            "TELEGRAM_TOKEN",
            "BOT_TOKEN",
            "API_TOKEN",
            "API_URL",
            "LIMIT",
            "SEARCH_LANG",
        ] {
            env::remove_var(key);
        }
    }

    // Env mutations are kept in a single test to avoid races between tests
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Defaults
        clear_env();
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        env::set_var("API_TOKEN", "api_token");
        env::set_var("API_URL", "https://search.example.com/api");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.limit, 100);
        assert_eq!(settings.lang, "en");
        assert_eq!(settings.report_cache_max_size, REPORT_CACHE_MAX_SIZE);
        assert!(settings.html_preamble_path.is_none());

        // 2. Overrides
        env::set_var("LIMIT", "25");
        env::set_var("SEARCH_LANG", "ru");
        let settings = Settings::new()?;
        assert_eq!(settings.limit, 25);
        assert_eq!(settings.lang, "ru");

        // 3. BOT_TOKEN fallback
        clear_env();
        env::set_var("BOT_TOKEN", "legacy_token");
        env::set_var("API_TOKEN", "api_token");
        env::set_var("API_URL", "https://search.example.com/api");
        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "legacy_token");

        // 4. Missing required values
        clear_env();
        env::set_var("API_URL", "https://search.example.com/api");
        env::set_var("API_TOKEN", "");
        assert!(Settings::new().is_err());

        clear_env();
        Ok(())
    }

    #[test]
    fn test_missing_preamble_is_none() {
        let settings = Settings {
            telegram_token: "dummy".to_string(),
            api_token: "token".to_string(),
            api_url: "https://search.example.com".to_string(),
            limit: 100,
            lang: "en".to_string(),
            html_preamble_path: Some(PathBuf::from("/nonexistent/preamble.html")),
            report_cache_ttl_secs: 60,
            report_cache_max_size: 10,
            search_http_timeout_secs: 5,
        };
        assert!(settings.load_html_preamble().is_none());
    }
}
