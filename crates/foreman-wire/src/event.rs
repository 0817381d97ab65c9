// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSONL event grammar an agent binary writes to stdout, one JSON
//! object per line.

use foreman_core::AgentSessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed line from an agent's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Always the first event after start; may recur after internal
    /// context compaction, in which case `session_id` may change.
    System(SystemEvent),
    Assistant(AssistantEvent),
    /// Stdin echo; carries no information the supervisor forwards.
    User(UserEvent),
    /// Marks the end of one turn, not the end of the session.
    Result(ResultEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub subtype: String,
    pub session_id: AgentSessionId,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Value,
}

impl SystemEvent {
    pub fn is_init(&self) -> bool {
        self.subtype == "init"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantEvent {
    pub message: AssistantMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    pub content: Vec<ContentBlock>,
}

impl AssistantMessage {
    /// Concatenate every `text` block's contents, the form the orchestrator
    /// forwards to the chat frontend. Empty if the turn was tool-use only.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse(ToolUse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEvent {
    pub subtype: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub num_turns: Option<u32>,
    pub session_id: AgentSessionId,
}

impl ResultEvent {
    pub fn is_success(&self) -> bool {
        self.subtype == "success"
    }
}

/// Parse one line of agent stdout. Malformed JSON is the caller's concern
/// to log-and-skip; this only reports the error.
pub fn parse_event_line(line: &str) -> Result<AgentEvent, serde_json::Error> {
    serde_json::from_str(line)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
