//! Runtime configuration
//!
//! Policies are plain values handed to the callbacks at construction time,
//! so tests can build agents with any denylist or cache table.

use crate::error::AdvisorError;
use crate::Result;
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_MARKET_DATA_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 500;

pub const DEFAULT_DISCLAIMER: &str = "### ⚠️ Legal Disclaimer: this is for informational and educational purposes only.\nPlease consult a financial advisor before making any investment decisions. ⚠️\n\n which ticker would you like to analyze?";

pub const DEFAULT_BLOCKED_MESSAGE: &str = "Crypto analysis is restricted by company policy.";

/// One canned answer served instead of a model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Matched case-insensitively as a substring of the user's text
    pub trigger: String,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub disclaimer_text: String,
    pub cached_responses: Vec<CachedResponse>,
    /// Stored upper-cased
    pub blocked_tickers: BTreeSet<String>,
    pub blocked_message: String,
}

impl PolicyConfig {
    pub fn with_blocked_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocked_tickers = normalize_tickers(tickers);
        self
    }

    pub fn with_cached_responses(mut self, cached_responses: Vec<CachedResponse>) -> Self {
        self.cached_responses = cached_responses;
        self
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            disclaimer_text: DEFAULT_DISCLAIMER.to_string(),
            cached_responses: vec![CachedResponse {
                trigger: "GOOGL".to_string(),
                response: "**GOOGL Analysis (Cached):\n** High growth in AI/Cloud...".to_string(),
            }],
            blocked_tickers: normalize_tickers(["BTC", "ETH", "DOGE"]),
            blocked_message: DEFAULT_BLOCKED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    /// Visited once to obtain the session cookie the crumb is tied to
    pub cookie_url: String,
    pub timeout: Duration,
    pub summary_max_chars: usize,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_DATA_BASE_URL.to_string(),
            cookie_url: DEFAULT_MARKET_DATA_COOKIE_URL.to_string(),
            timeout: Duration::from_secs(30),
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub model: String,
    pub policy: PolicyConfig,
    pub market_data: MarketDataConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            policy: PolicyConfig::default(),
            market_data: MarketDataConfig::default(),
        }
    }
}

impl AdvisorConfig {
    /// Build from the process environment, falling back to defaults.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("ADVISOR_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }

        if let Some(base_url) = lookup("MARKET_DATA_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.market_data.base_url = base_url.trim().trim_end_matches('/').to_string();
        }

        if let Some(cookie_url) = lookup("MARKET_DATA_COOKIE_URL").filter(|v| !v.trim().is_empty()) {
            config.market_data.cookie_url = cookie_url.trim().to_string();
        }

        if let Some(raw) = lookup("MARKET_DATA_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                AdvisorError::Config(format!(
                    "MARKET_DATA_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?;
            config.market_data.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("BLOCKED_TICKERS") {
            config.policy = config
                .policy
                .with_blocked_tickers(raw.split(',').filter(|t| !t.trim().is_empty()));
        }

        Ok(config)
    }
}

fn normalize_tickers<I, S>(tickers: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tickers
        .into_iter()
        .map(|t| t.as_ref().trim().to_uppercase())
        .collect()
}
