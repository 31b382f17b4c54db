//! Show the legal disclaimer once per conversation

use super::{BeforeAgentCallback, CallbackContext};
use crate::config::PolicyConfig;
use crate::models::Content;
use tracing::info;

pub struct DisclaimerGate {
    message: String,
}

impl DisclaimerGate {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.disclaimer_text.clone())
    }
}

impl BeforeAgentCallback for DisclaimerGate {
    fn name(&self) -> &'static str {
        "enforce_disclaimer"
    }

    fn before_agent(&self, ctx: &mut CallbackContext<'_>) -> Option<Content> {
        if !ctx.state.mark_disclaimer_shown() {
            return None;
        }

        info!(
            agent = %ctx.agent_name,
            conversation_id = %ctx.state.conversation_id,
            "Disclaimer shown"
        );

        Some(Content::model_text(self.message.clone()))
    }
}
