//! Conversation state
//!
//! One `ConversationState` per conversation. It is created when the
//! conversation starts, mutated by the callbacks and dropped when the
//! conversation ends. Nothing here is process-wide.

use crate::error::AdvisorError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DISCLAIMER_SHOWN_KEY: &str = "disclaimer_shown";

/// One-shot disclaimer: `Pending -> Shown`, never back
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisclaimerState {
    #[default]
    Pending,
    Shown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredConversationState")]
pub struct ConversationState {
    pub conversation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    disclaimer: DisclaimerState,
    values: Map<String, Value>,
}

/// Wire shape of a persisted state, before the disclaimer mirror is rebuilt
#[derive(Deserialize)]
struct StoredConversationState {
    conversation_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    disclaimer: DisclaimerState,
    #[serde(default)]
    values: Map<String, Value>,
}

impl From<StoredConversationState> for ConversationState {
    fn from(stored: StoredConversationState) -> Self {
        // `disclaimer` is authoritative; the stored mirror is discarded
        let mut values = stored.values;
        values.remove(DISCLAIMER_SHOWN_KEY);
        if stored.disclaimer == DisclaimerState::Shown {
            values.insert(DISCLAIMER_SHOWN_KEY.to_string(), Value::Bool(true));
        }

        Self {
            conversation_id: stored.conversation_id,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            disclaimer: stored.disclaimer,
            values,
        }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(conversation_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            conversation_id,
            created_at: now,
            updated_at: now,
            disclaimer: DisclaimerState::Pending,
            values: Map::new(),
        }
    }

    pub fn disclaimer(&self) -> DisclaimerState {
        self.disclaimer
    }

    /// Take the `Pending -> Shown` transition.
    ///
    /// Returns `true` only for the call that performed it.
    pub fn mark_disclaimer_shown(&mut self) -> bool {
        if self.disclaimer == DisclaimerState::Shown {
            return false;
        }

        self.disclaimer = DisclaimerState::Shown;
        self.values
            .insert(DISCLAIMER_SHOWN_KEY.to_string(), Value::Bool(true));
        self.updated_at = Utc::now();
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a free-form value. The disclaimer key is owned by the state
    /// machine and cannot be written here.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if key == DISCLAIMER_SHOWN_KEY {
            return Err(AdvisorError::State(format!(
                "'{}' is managed by the disclaimer gate",
                DISCLAIMER_SHOWN_KEY
            )));
        }

        self.values.insert(key, value);
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for conversation state persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn start(&self) -> Result<ConversationState>;
    async fn load(&self, conversation_id: Uuid) -> Result<Option<ConversationState>>;
    async fn save(&self, state: &ConversationState) -> Result<()>;
    /// Discard the conversation. Returns whether it existed.
    async fn end(&self, conversation_id: Uuid) -> Result<bool>;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ConversationState>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {

    async fn start(&self) -> Result<ConversationState> {
        let state = ConversationState::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(state.conversation_id, state.clone());
        Ok(state)
    }

    async fn load(&self, conversation_id: Uuid) -> Result<Option<ConversationState>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&conversation_id).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<()> {
        let mut sessions = self.sessions.write().await;

        // Reject writes that would move an already-shown disclaimer back
        if let Some(existing) = sessions.get(&state.conversation_id) {
            if existing.disclaimer == DisclaimerState::Shown
                && state.disclaimer == DisclaimerState::Pending
            {
                return Err(AdvisorError::State(format!(
                    "conversation {} would reset its disclaimer",
                    state.conversation_id
                )));
            }
        }

        sessions.insert(state.conversation_id, state.clone());
        Ok(())
    }

    async fn end(&self, conversation_id: Uuid) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&conversation_id).is_some())
    }
}
