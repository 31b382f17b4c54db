//! Yahoo Finance market data source
//!
//! Thin binding over the `quoteSummary` endpoint. Uses a long-lived
//! reqwest::Client for connection pooling. Yahoo only answers
//! `quoteSummary` for clients holding a session cookie and the matching
//! crumb, so the first request performs that handshake and the crumb is
//! reused until Yahoo rejects it.

use super::{MarketDataSource, TickerInfo};
use crate::config::MarketDataConfig;
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

const QUOTE_MODULES: &str = "financialData,assetProfile";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; financial-advisor-agents/0.1)";
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct YahooFinanceSource {
    client: Client,
    base_url: Url,
    cookie_url: String,
    crumb: RwLock<Option<String>>,
}

impl YahooFinanceSource {
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            AdvisorError::Config(format!(
                "invalid market data base URL '{}': {}",
                config.base_url, e
            ))
        })?;

        Ok(Self {
            client,
            base_url,
            cookie_url: config.cookie_url.clone(),
            crumb: RwLock::new(None),
        })
    }

    /// Base URL with `segments` appended. Each segment is percent-encoded,
    /// so a ticker can never add path components, a query or a fragment.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);

        url.path_segments_mut()
            .map_err(|_| {
                AdvisorError::Config(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn quote_url(&self, ticker: &str) -> Result<Url> {
        // "." and ".." would be dropped as path segments
        if matches!(ticker, "." | "..") {
            return Err(AdvisorError::MarketData(format!("invalid ticker '{}'", ticker)));
        }

        self.endpoint_url(&["v10", "finance", "quoteSummary", ticker])
    }

    async fn crumb(&self) -> Result<String> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut cached = self.crumb.write().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie endpoint answers 404 but still sets the session cookie
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            warn!(cookie_url = %self.cookie_url, error = %e, "Session cookie request failed");
        }

        let url = self.endpoint_url(&["v1", "test", "getcrumb"])?;
        let response = self.client.get(url).send().await.map_err(|e| {
            AdvisorError::MarketData(format!("crumb request failed: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AdvisorError::MarketData(format!("crumb response could not be read: {}", e))
        })?;

        if !status.is_success() {
            return Err(AdvisorError::MarketData(describe_failure(status, &body)));
        }

        let crumb = parse_crumb(&body)?;
        info!("Obtained Yahoo Finance crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn forget_crumb(&self) {
        *self.crumb.write().await = None;
    }

    async fn request_quote(&self, ticker: &str) -> Result<(StatusCode, String)> {
        let crumb = self.crumb().await?;
        let url = self.quote_url(ticker)?;
        debug!(url = %url, "Requesting quote summary");

        let response = self
            .client
            .get(url)
            .query(&[("modules", QUOTE_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Quote summary request failed: {}", e);
                AdvisorError::MarketData(format!("request for {} failed: {}", ticker, e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AdvisorError::MarketData(format!("response for {} could not be read: {}", ticker, e))
        })?;

        Ok((status, body))
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceSource {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo> {
        if ticker.trim().is_empty() {
            return Err(AdvisorError::MarketData("ticker is empty".to_string()));
        }

        let (mut status, mut body) = self.request_quote(ticker).await?;

        // A stale crumb is answered with 401; refresh it once
        if status == StatusCode::UNAUTHORIZED {
            warn!(ticker = %ticker, "Crumb rejected, refreshing session");
            self.forget_crumb().await;
            (status, body) = self.request_quote(ticker).await?;
        }

        if !status.is_success() {
            return Err(AdvisorError::MarketData(format!(
                "Yahoo Finance request for {} failed: {}",
                ticker,
                describe_failure(status, &body)
            )));
        }

        let body: Value = serde_json::from_str(&body).map_err(|e| {
            AdvisorError::MarketData(format!("invalid JSON response for {}: {}", ticker, e))
        })?;

        parse_quote_summary(ticker, &body)
    }
}

/// Error description from either `quoteSummary.error` or `finance.error`
fn quote_error_description(body: &Value) -> Option<String> {
    ["quoteSummary", "finance"]
        .iter()
        .filter_map(|root| body.get(*root)?.get("error"))
        .find(|error| !error.is_null())
        .map(|error| {
            error
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string())
        })
}

/// Status line plus whatever detail the body carries, JSON or not
fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| quote_error_description(&v))
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

    if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    }
}

fn parse_crumb(body: &str) -> Result<String> {
    let crumb = body.trim();
    if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.starts_with('<') {
        return Err(AdvisorError::MarketData(
            "Yahoo Finance did not return a crumb".to_string(),
        ));
    }

    Ok(crumb.to_string())
}

/// Map a `quoteSummary` body onto the fields the accessor needs
pub(crate) fn parse_quote_summary(ticker: &str, body: &Value) -> Result<TickerInfo> {
    if let Some(description) = quote_error_description(body) {
        return Err(AdvisorError::MarketData(description));
    }

    let result = body
        .get("quoteSummary")
        .and_then(|q| q.get("result"))
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| {
            AdvisorError::MarketData(format!("no quote summary returned for {}", ticker))
        })?;

    let financial = result.get("financialData");
    let profile = result.get("assetProfile");

    // Prices arrive either as {"raw": 1.0, "fmt": "1.00"} or as a bare number
    let current_price = financial
        .and_then(|f| f.get("currentPrice"))
        .and_then(|p| p.get("raw").unwrap_or(p).as_f64());

    let text_field = |key: &str| {
        profile
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(TickerInfo {
        current_price,
        industry: text_field("industry"),
        long_business_summary: text_field("longBusinessSummary"),
    })
}
