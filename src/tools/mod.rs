//! Tool trait and registry
//!
//! Tools are what the framework calls on an agent's behalf. The market data
//! tool always answers with a record, even when the source fails.

use crate::error::AdvisorError;
use crate::market_data::{fetch_real_market_data, MarketDataSource};
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up tools by name
#[derive(Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

fn require_ticker(input: &ToolInput) -> Result<String> {
    input
        .parameters
        .get("ticker")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AdvisorError::InvalidToolInput("Expected 'ticker' in tool_input".to_string())
        })
}

/// Fetches real-time stock data from the web for a given ticker
pub struct FetchRealMarketDataTool {
    source: Arc<dyn MarketDataSource>,
    summary_max_chars: usize,
}

impl FetchRealMarketDataTool {
    pub const NAME: &'static str = "fetch_real_market_data";

    pub fn new(source: Arc<dyn MarketDataSource>, summary_max_chars: usize) -> Self {
        Self {
            source,
            summary_max_chars,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FetchRealMarketDataTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Fetches real-time stock data from the web for a given ticker."
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_ticker(input)?;

        let record =
            fetch_real_market_data(self.source.as_ref(), &ticker, self.summary_max_chars).await;
        let error = match &record {
            crate::models::MarketDataRecord::Error { error } => Some(error.clone()),
            _ => None,
        };

        Ok(ToolOutput {
            success: error.is_none(),
            data: serde_json::to_value(&record)?,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::TickerInfo;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn ticker_info(&self, _ticker: &str) -> Result<TickerInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TickerInfo {
                current_price: Some(10.0),
                industry: Some("Testing".to_string()),
                long_business_summary: Some("short".to_string()),
            })
        }
    }

    fn tool() -> (Arc<CountingSource>, FetchRealMarketDataTool) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let tool = FetchRealMarketDataTool::new(source.clone(), 500);
        (source, tool)
    }

    #[tokio::test]
    async fn test_fetch_tool_returns_record() {
        let (source, tool) = tool();
        let input = ToolInput {
            tool_name: FetchRealMarketDataTool::NAME.to_string(),
            parameters: json!({ "ticker": "Aapl" }),
        };

        let output = tool.execute(&input).await.unwrap();
        assert!(output.success);
        assert!(output.error.is_none());
        assert_eq!(output.data["ticker"], "Aapl");
        assert_eq!(output.data["summary"], "short...");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_tool_requires_ticker() {
        let (source, tool) = tool();
        let input = ToolInput {
            tool_name: FetchRealMarketDataTool::NAME.to_string(),
            parameters: json!({ "symbol": "AAPL" }),
        };

        let result = tool.execute(&input).await;
        assert!(matches!(result, Err(AdvisorError::InvalidToolInput(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registry_lookup() {
        let (_, tool) = tool();
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(tool));
        assert_eq!(registry.list(), vec!["fetch_real_market_data"]);
        assert!(registry.get("fetch_real_market_data").is_some());
        assert!(registry.get("web_search").is_none());
    }
}
