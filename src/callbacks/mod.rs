//! Lifecycle callbacks
//!
//! The framework calls these before an agent's turn, before a model call and
//! before a tool call. Returning `Some` short-circuits that step; `None` lets
//! it proceed.

use crate::models::{Content, LlmRequest, LlmResponse};
use crate::state::ConversationState;
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub mod cache;
pub mod denylist;
pub mod disclaimer;

pub use cache::CachedResponsePolicy;
pub use denylist::BlockedTickerPolicy;
pub use disclaimer::DisclaimerGate;

/// Context for agent and model callbacks
pub struct CallbackContext<'a> {
    pub agent_name: String,
    pub invocation_id: Uuid,
    /// Latest message the user sent in this turn
    pub user_content: Option<Content>,
    pub state: &'a mut ConversationState,
}

impl<'a> CallbackContext<'a> {
    pub fn new(
        agent_name: impl Into<String>,
        user_content: Option<Content>,
        state: &'a mut ConversationState,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            invocation_id: Uuid::new_v4(),
            user_content,
            state,
        }
    }
}

/// Context for tool callbacks
pub struct ToolContext<'a> {
    pub agent_name: String,
    pub invocation_id: Uuid,
    pub state: &'a mut ConversationState,
}

impl<'a> ToolContext<'a> {
    pub fn new(agent_name: impl Into<String>, state: &'a mut ConversationState) -> Self {
        Self {
            agent_name: agent_name.into(),
            invocation_id: Uuid::new_v4(),
            state,
        }
    }
}

/// Runs before an agent takes its turn.
/// Return Some(content) to answer in place of the agent.
pub trait BeforeAgentCallback: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_agent(&self, ctx: &mut CallbackContext<'_>) -> Option<Content>;
}

/// Runs before a model call.
/// Return Some(response) to skip the model and use this response instead.
#[async_trait]
pub trait BeforeModelCallback: Send + Sync {
    fn name(&self) -> &'static str;
    async fn before_model(
        &self,
        ctx: &mut CallbackContext<'_>,
        request: &LlmRequest,
    ) -> Option<LlmResponse>;
}

/// Runs before a tool call.
/// Return Some(payload) to block the tool; the payload is handed back as
/// the tool's result.
pub trait BeforeToolCallback: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_tool(
        &self,
        tool: &dyn Tool,
        args: &Value,
        ctx: &mut ToolContext<'_>,
    ) -> Option<Value>;
}
