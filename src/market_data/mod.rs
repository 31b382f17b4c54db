//! Market data accessor
//!
//! `fetch_real_market_data` is the only entry point the tool layer uses.
//! It never returns an error: every failure from the source becomes a
//! `MarketDataRecord::Error`.

use crate::models::{CurrentPrice, MarketDataRecord};
use crate::Result;
use async_trait::async_trait;
use tracing::{info, warn};

pub mod yahoo;
pub use yahoo::YahooFinanceSource;

pub const UNKNOWN_INDUSTRY: &str = "Unknown";
pub const NO_SUMMARY: &str = "No summary available";
pub const ELLIPSIS: &str = "...";

/// Raw fields pulled from the external data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerInfo {
    pub current_price: Option<f64>,
    pub industry: Option<String>,
    pub long_business_summary: Option<String>,
}

/// Seam to the external market data library
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo>;
}

/// Fetch and shape market data for `ticker`.
///
/// The summary is cut to `summary_max_chars` characters and `...` is always
/// appended, including to summaries that were already short.
pub async fn fetch_real_market_data(
    source: &dyn MarketDataSource,
    ticker: &str,
    summary_max_chars: usize,
) -> MarketDataRecord {
    info!(ticker = %ticker, source = source.name(), "Fetching real web data");

    match source.ticker_info(ticker).await {
        Ok(info) => {
            let summary = info
                .long_business_summary
                .as_deref()
                .unwrap_or(NO_SUMMARY);

            MarketDataRecord::Quote {
                ticker: ticker.to_string(),
                current_price: CurrentPrice::from(info.current_price),
                industry: info
                    .industry
                    .unwrap_or_else(|| UNKNOWN_INDUSTRY.to_string()),
                summary: format!("{}{}", truncate_chars(summary, summary_max_chars), ELLIPSIS),
            }
        }
        Err(e) => {
            warn!(ticker = %ticker, error = %e, "Market data fetch failed");
            MarketDataRecord::Error {
                error: format!("Failed to fetch data from the web: {}", e),
            }
        }
    }
}

/// First `max_chars` characters, never splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
