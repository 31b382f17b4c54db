//! Agent definitions
//!
//! Two agents: `pro_advisor` talks to the user and hands ticker work to its
//! sub-agent `data_analyst`. Both are plain configuration read by the agent
//! framework; the `run_*` and `call_tool` helpers are the single entry point
//! per lifecycle hook so the framework never has to reach into the fields.

use crate::callbacks::{
    BeforeAgentCallback, BeforeModelCallback, BeforeToolCallback, BlockedTickerPolicy,
    CachedResponsePolicy, CallbackContext, DisclaimerGate, ToolContext,
};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::market_data::MarketDataSource;
use crate::models::{Content, LlmRequest, LlmResponse, ToolInput};
use crate::state::ConversationState;
use crate::tools::{FetchRealMarketDataTool, Tool, ToolRegistry};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const PRO_ADVISOR: &str = "pro_advisor";
pub const DATA_ANALYST: &str = "data_analyst";

const DATA_ANALYST_DESCRIPTION: &str = "Analyzes real market data for tickers.";

const DATA_ANALYST_INSTRUCTION: &str = r#"Use the fetch_real_market_data tool to pull live data.
Do NOT summarize the findings to the user directly.
Once you have the data, use the transfer_to_agent tool to transfer control back to 'pro_advisor'."#;

const PRO_ADVISOR_INSTRUCTION: &str = r#"Coordinate with your analyst to help the user with financial questions.
step 1. Ask the user for a stock ticker they want to analyze.
step 2. run the data_analyst sub-agent to fetch the data.
step 3. When data_analyst transfers control back to you, summarize its findings for the user.
step 4. IMPORTANT!!!! ALWAYS ask the user if they have follow-up questions or another ticker to analyze."#;

/// Declarative agent record
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub description: Option<String>,
    pub instruction: String,
    pub tools: ToolRegistry,
    pub sub_agents: Vec<AgentConfig>,
    pub before_agent: Option<Arc<dyn BeforeAgentCallback>>,
    pub before_model: Option<Arc<dyn BeforeModelCallback>>,
    pub before_tool: Option<Arc<dyn BeforeToolCallback>>,
}

impl AgentConfig {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: None,
            instruction: instruction.into(),
            tools: ToolRegistry::new(),
            sub_agents: Vec::new(),
            before_agent: None,
            before_model: None,
            before_tool: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn with_sub_agent(mut self, agent: AgentConfig) -> Self {
        self.sub_agents.push(agent);
        self
    }

    pub fn with_before_agent(mut self, callback: Arc<dyn BeforeAgentCallback>) -> Self {
        self.before_agent = Some(callback);
        self
    }

    pub fn with_before_model(mut self, callback: Arc<dyn BeforeModelCallback>) -> Self {
        self.before_model = Some(callback);
        self
    }

    pub fn with_before_tool(mut self, callback: Arc<dyn BeforeToolCallback>) -> Self {
        self.before_tool = Some(callback);
        self
    }

    /// Depth-first search of this agent and its sub-agents.
    /// `transfer_to_agent` targets are resolved through this.
    pub fn find_agent(&self, name: &str) -> Option<&AgentConfig> {
        if self.name == name {
            return Some(self);
        }

        self.sub_agents.iter().find_map(|a| a.find_agent(name))
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.list()
    }

    /// Pre-agent hook. `Some` replaces the agent's turn.
    pub fn run_before_agent(
        &self,
        state: &mut ConversationState,
        user_content: Option<Content>,
    ) -> Option<Content> {
        let callback = self.before_agent.as_ref()?;
        let mut ctx = CallbackContext::new(self.name.clone(), user_content, state);

        let output = callback.before_agent(&mut ctx);
        debug!(
            agent = %self.name,
            callback = callback.name(),
            overridden = output.is_some(),
            "before_agent"
        );
        output
    }

    /// Pre-model hook. `Some` replaces the model response.
    pub async fn run_before_model(
        &self,
        state: &mut ConversationState,
        user_content: Option<Content>,
        request: &LlmRequest,
    ) -> Option<LlmResponse> {
        let callback = self.before_model.as_ref()?;
        let mut ctx = CallbackContext::new(self.name.clone(), user_content, state);

        let response = callback.before_model(&mut ctx, request).await;
        debug!(
            agent = %self.name,
            callback = callback.name(),
            overridden = response.is_some(),
            "before_model"
        );
        response
    }

    /// Run one of this agent's tools behind its pre-tool hook.
    ///
    /// A blocked call returns the hook's payload as the result; the tool is
    /// not executed.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        args: Value,
        state: &mut ConversationState,
    ) -> Result<Value> {
        let tool = self.tools.get(tool_name).ok_or_else(|| {
            AdvisorError::ToolNotFound(format!("{} has no tool '{}'", self.name, tool_name))
        })?;

        if let Some(callback) = &self.before_tool {
            let mut ctx = ToolContext::new(self.name.clone(), state);
            if let Some(payload) = callback.before_tool(tool.as_ref(), &args, &mut ctx) {
                info!(
                    agent = %self.name,
                    tool = tool_name,
                    callback = callback.name(),
                    "Tool call blocked"
                );
                return Ok(payload);
            }
        }

        let input = ToolInput {
            tool_name: tool_name.to_string(),
            parameters: args,
        };
        let output = tool.execute(&input).await?;
        Ok(output.data)
    }

    /// Run the hooks that can answer a user message before any model call:
    /// this agent's pre-agent hook, then `target`'s pre-model hook.
    ///
    /// A pre-agent override ends the turn, so the pre-model hook does not run.
    /// `None` means the model call would proceed.
    pub async fn preview_turn(
        &self,
        target: &str,
        state: &mut ConversationState,
        user_content: Content,
    ) -> Result<Option<HookReply>> {
        let agent = self
            .find_agent(target)
            .ok_or_else(|| AdvisorError::Config(format!("no agent named '{}'", target)))?;

        if let Some(content) = self.run_before_agent(state, Some(user_content.clone())) {
            return Ok(Some(HookReply {
                agent: self.name.clone(),
                content,
            }));
        }

        let request = LlmRequest {
            model: agent.model.clone(),
            contents: vec![user_content.clone()],
            system_instruction: Some(agent.instruction.clone()),
        };
        let reply = agent
            .run_before_model(state, Some(user_content), &request)
            .await
            .map(|response| HookReply {
                agent: agent.name.clone(),
                content: response.content,
            });
        Ok(reply)
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            model: self.model.clone(),
            description: self.description.clone(),
            instruction: self.instruction.clone(),
            tools: self.tool_names().into_iter().map(str::to_string).collect(),
            before_agent: self.before_agent.as_ref().map(|c| c.name()),
            before_model: self.before_model.as_ref().map(|c| c.name()),
            before_tool: self.before_tool.as_ref().map(|c| c.name()),
            sub_agents: self.sub_agents.iter().map(AgentConfig::summary).collect(),
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field("sub_agents", &self.sub_agents)
            .finish_non_exhaustive()
    }
}

/// Reply produced by a hook instead of a model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReply {
    pub agent: String,
    pub content: Content,
}

/// Serializable view of an agent tree
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub instruction: String,
    pub tools: Vec<String>,
    pub before_agent: Option<&'static str>,
    pub before_model: Option<&'static str>,
    pub before_tool: Option<&'static str>,
    pub sub_agents: Vec<AgentSummary>,
}

pub fn data_analyst(config: &AdvisorConfig, source: Arc<dyn MarketDataSource>) -> AgentConfig {
    AgentConfig::new(DATA_ANALYST, config.model.clone(), DATA_ANALYST_INSTRUCTION)
        .with_description(DATA_ANALYST_DESCRIPTION)
        .with_tool(Arc::new(FetchRealMarketDataTool::new(
            source,
            config.market_data.summary_max_chars,
        )))
        .with_before_model(Arc::new(CachedResponsePolicy::from_policy(&config.policy)))
        .with_before_tool(Arc::new(BlockedTickerPolicy::from_policy(&config.policy)))
}

pub fn pro_advisor(config: &AdvisorConfig, analyst: AgentConfig) -> AgentConfig {
    AgentConfig::new(PRO_ADVISOR, config.model.clone(), PRO_ADVISOR_INSTRUCTION)
        .with_sub_agent(analyst)
        .with_before_agent(Arc::new(DisclaimerGate::from_policy(&config.policy)))
}

/// Build the root agent (`pro_advisor`) with `data_analyst` beneath it
pub fn build_agent_tree(config: &AdvisorConfig, source: Arc<dyn MarketDataSource>) -> AgentConfig {
    pro_advisor(config, data_analyst(config, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::TickerInfo;
    use crate::state::DisclaimerState;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn ticker_info(&self, _ticker: &str) -> Result<TickerInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TickerInfo {
                current_price: Some(231.59),
                industry: Some("Consumer Electronics".to_string()),
                long_business_summary: Some("x".repeat(600)),
            })
        }
    }

    fn tree() -> (Arc<StubSource>, AgentConfig) {
        let source = Arc::new(StubSource {
            calls: AtomicUsize::new(0),
        });
        let root = build_agent_tree(&AdvisorConfig::default(), source.clone());
        (source, root)
    }

    fn request() -> LlmRequest {
        LlmRequest {
            model: "gemini-2.5-flash".to_string(),
            contents: vec![],
            system_instruction: None,
        }
    }

    #[test]
    fn test_agent_tree_shape() {
        let (_, root) = tree();

        assert_eq!(root.name, PRO_ADVISOR);
        assert_eq!(root.model, "gemini-2.5-flash");
        assert!(root.tool_names().is_empty());
        assert!(root.before_agent.is_some());
        assert!(root.before_model.is_none());
        assert_eq!(root.sub_agents.len(), 1);

        let analyst = root.find_agent(DATA_ANALYST).unwrap();
        assert_eq!(analyst.tool_names(), vec!["fetch_real_market_data"]);
        assert!(analyst.before_model.is_some());
        assert!(analyst.before_tool.is_some());
        assert!(analyst.instruction.contains("transfer_to_agent"));
        assert!(root.find_agent("risk_officer").is_none());
    }

    #[test]
    fn test_summary_lists_hooks() {
        let (_, root) = tree();
        let value = serde_json::to_value(root.summary()).unwrap();

        assert_eq!(value["name"], PRO_ADVISOR);
        assert_eq!(value["before_agent"], "enforce_disclaimer");
        assert_eq!(value["sub_agents"][0]["before_model"], "cache_googl_analysis");
        assert_eq!(value["sub_agents"][0]["before_tool"], "block_crypto_tool");
        assert_eq!(value["sub_agents"][0]["tools"][0], "fetch_real_market_data");
    }

    #[test]
    fn test_root_disclaimer_once() {
        let (_, root) = tree();
        let mut state = ConversationState::new();

        assert!(root
            .run_before_agent(&mut state, Some(Content::user_text("hi")))
            .is_some());
        assert_eq!(state.disclaimer(), DisclaimerState::Shown);
        assert!(root
            .run_before_agent(&mut state, Some(Content::user_text("AAPL")))
            .is_none());
    }

    #[tokio::test]
    async fn test_analyst_cache_hook() {
        let (_, root) = tree();
        let analyst = root.find_agent(DATA_ANALYST).unwrap();
        let mut state = ConversationState::new();

        let hit = analyst
            .run_before_model(&mut state, Some(Content::user_text("googl")), &request())
            .await;
        assert!(hit.is_some());

        let miss = analyst
            .run_before_model(&mut state, Some(Content::user_text("AAPL")), &request())
            .await;
        assert!(miss.is_none());

        // No model hook on the root
        assert!(root
            .run_before_model(&mut state, Some(Content::user_text("googl")), &request())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_disclaimer_turn_skips_model_hook() {
        let (_, root) = tree();
        let mut state = ConversationState::new();

        // First message would also hit the cache; the disclaimer answers alone
        let first = root
            .preview_turn(DATA_ANALYST, &mut state, Content::user_text("GOOGL please"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.agent, PRO_ADVISOR);
        assert!(first.content.first_text().unwrap().contains("Legal Disclaimer"));
        assert_eq!(state.disclaimer(), DisclaimerState::Shown);

        let second = root
            .preview_turn(DATA_ANALYST, &mut state, Content::user_text("GOOGL please"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.agent, DATA_ANALYST);
        assert!(second.content.first_text().unwrap().contains("(Cached)"));

        let third = root
            .preview_turn(DATA_ANALYST, &mut state, Content::user_text("AAPL"))
            .await
            .unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn test_preview_turn_unknown_agent() {
        let (_, root) = tree();
        let mut state = ConversationState::new();
        let result = root
            .preview_turn("risk_officer", &mut state, Content::user_text("hi"))
            .await;
        assert!(matches!(result, Err(AdvisorError::Config(_))));
        assert_eq!(state.disclaimer(), DisclaimerState::Pending);
    }

    #[tokio::test]
    async fn test_blocked_ticker_never_reaches_source() {
        let (source, root) = tree();
        let analyst = root.find_agent(DATA_ANALYST).unwrap();
        let mut state = ConversationState::new();

        let result = analyst
            .call_tool("fetch_real_market_data", json!({ "ticker": "eth" }), &mut state)
            .await
            .unwrap();

        assert_eq!(
            result,
            json!({ "error": "Crypto analysis is restricted by company policy." })
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_allowed_ticker_fetches() {
        let (source, root) = tree();
        let analyst = root.find_agent(DATA_ANALYST).unwrap();
        let mut state = ConversationState::new();

        let result = analyst
            .call_tool("fetch_real_market_data", json!({ "ticker": "AAPL" }), &mut state)
            .await
            .unwrap();

        assert_eq!(result["ticker"], "AAPL");
        assert_eq!(result["current_price"], 231.59);
        assert_eq!(result["summary"].as_str().unwrap().chars().count(), 503);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_, root) = tree();
        let mut state = ConversationState::new();

        let result = root
            .call_tool("fetch_real_market_data", json!({ "ticker": "AAPL" }), &mut state)
            .await;
        assert!(matches!(result, Err(AdvisorError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_injected_policy_reaches_agents() {
        let mut config = AdvisorConfig::default();
        config.policy = config.policy.with_blocked_tickers(["AAPL"]);
        config.model = "gemini-2.0-flash".to_string();

        let source = Arc::new(StubSource {
            calls: AtomicUsize::new(0),
        });
        let root = build_agent_tree(&config, source.clone());
        assert_eq!(root.model, "gemini-2.0-flash");

        let analyst = root.find_agent(DATA_ANALYST).unwrap();
        assert_eq!(analyst.model, "gemini-2.0-flash");

        let mut state = ConversationState::new();
        let blocked = analyst
            .call_tool("fetch_real_market_data", json!({ "ticker": "aapl" }), &mut state)
            .await
            .unwrap();
        assert!(blocked.get("error").is_some());

        let allowed = analyst
            .call_tool("fetch_real_market_data", json!({ "ticker": "BTC" }), &mut state)
            .await
            .unwrap();
        assert_eq!(allowed["ticker"], "BTC");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
