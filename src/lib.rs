//! Financial Advisor Agents
//!
//! Configuration and policy for two cooperating conversational agents:
//! - `pro_advisor` talks to the user and shows a one-time legal disclaimer
//! - `data_analyst` fetches live market data for a ticker
//!
//! The agent framework drives the conversation. This crate supplies the
//! agent records, the lifecycle callbacks and the market data tool.
//!
//! HOOKS:
//! before_agent → disclaimer gate | before_model → cached analyses | before_tool → ticker denylist

pub mod agent;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod market_data;
pub mod models;
pub mod state;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::{build_agent_tree, AgentConfig};
pub use config::AdvisorConfig;
