//! Block tool calls for restricted tickers

use super::{BeforeToolCallback, ToolContext};
use crate::config::PolicyConfig;
use crate::tools::Tool;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::warn;

pub struct BlockedTickerPolicy {
    blocked: BTreeSet<String>,
    message: String,
}

impl BlockedTickerPolicy {
    pub fn new<I, S>(tickers: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked: tickers
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .collect(),
            message: message.into(),
        }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(&policy.blocked_tickers, policy.blocked_message.clone())
    }

    pub fn is_blocked(&self, ticker: &str) -> bool {
        self.blocked.contains(&ticker.to_uppercase())
    }
}

impl BeforeToolCallback for BlockedTickerPolicy {
    fn name(&self) -> &'static str {
        "block_crypto_tool"
    }

    fn before_tool(
        &self,
        tool: &dyn Tool,
        args: &Value,
        ctx: &mut ToolContext<'_>,
    ) -> Option<Value> {
        let ticker = args
            .get("ticker")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase();

        if !self.blocked.contains(&ticker) {
            return None;
        }

        warn!(
            agent = %ctx.agent_name,
            tool = tool.name(),
            ticker = %ticker,
            "[TOOL BLOCKED] Cannot analyze crypto"
        );

        Some(json!({ "error": self.message }))
    }
}
