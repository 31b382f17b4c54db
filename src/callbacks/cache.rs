//! Serve canned analyses without calling the model
//!
//! Substring match only. No eviction, no TTL.

use super::{BeforeModelCallback, CallbackContext};
use crate::config::{CachedResponse, PolicyConfig};
use crate::models::{Content, LlmRequest, LlmResponse};
use async_trait::async_trait;
use tracing::info;

pub struct CachedResponsePolicy {
    /// Triggers are kept upper-cased
    entries: Vec<CachedResponse>,
}

impl CachedResponsePolicy {
    pub fn new(entries: Vec<CachedResponse>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| CachedResponse {
                trigger: e.trigger.to_uppercase(),
                response: e.response,
            })
            .collect();

        Self { entries }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.cached_responses.clone())
    }

    /// First entry whose trigger occurs in `text`, ignoring case
    pub fn lookup(&self, text: &str) -> Option<&CachedResponse> {
        let text = text.to_uppercase();
        self.entries
            .iter()
            .find(|e| !e.trigger.is_empty() && text.contains(&e.trigger))
    }
}

#[async_trait]
impl BeforeModelCallback for CachedResponsePolicy {
    fn name(&self) -> &'static str {
        "cache_googl_analysis"
    }

    async fn before_model(
        &self,
        ctx: &mut CallbackContext<'_>,
        _request: &LlmRequest,
    ) -> Option<LlmResponse> {
        let text = ctx
            .user_content
            .as_ref()
            .and_then(Content::first_text)
            .unwrap_or_default();

        let hit = self.lookup(text)?;

        info!(agent = %ctx.agent_name, trigger = %hit.trigger, "[Cache Hit] Serving static report");

        Some(LlmResponse {
            content: Content::model_text(hit.response.clone()),
        })
    }
}
