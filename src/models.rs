//! Core data models for the advisor agents

use serde::{Deserialize, Serialize};

//
// ================= Messages =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Single-part message authored by the model
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Single-part message authored by the user
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

//
// ================= Model I/O =================
//

/// Request the framework is about to send to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
}

/// Model response, or an override that replaces one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmResponse {
    pub content: Content,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

//
// ================= Market Data =================
//

pub const PRICE_UNAVAILABLE: &str = "Data unavailable";

/// `current_price` is a number when quoted, otherwise the sentinel string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CurrentPrice {
    Quoted(f64),
    Unavailable(String),
}

impl CurrentPrice {
    pub fn unavailable() -> Self {
        CurrentPrice::Unavailable(PRICE_UNAVAILABLE.to_string())
    }
}

impl From<Option<f64>> for CurrentPrice {
    fn from(price: Option<f64>) -> Self {
        price.map(CurrentPrice::Quoted).unwrap_or_else(CurrentPrice::unavailable)
    }
}

/// Shaped tool result: either a quote or a single `error` field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MarketDataRecord {
    Quote {
        ticker: String,
        current_price: CurrentPrice,
        industry: String,
        summary: String,
    },
    Error {
        error: String,
    },
}

impl MarketDataRecord {
    pub fn is_error(&self) -> bool {
        matches!(self, MarketDataRecord::Error { .. })
    }
}
