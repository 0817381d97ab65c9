// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`IncomingMessage`] shape produced by any frontend adapter.

use crate::ids::{ChatMessageId, TaskName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound event from the chat frontend, already resolved to a task.
///
/// Text-only and callback-only variants are both valid — a button click
/// carries `callback_data` with no `text`, a plain message carries `text`
/// with no `callback_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Resolved by the adapter from the external thread identifier;
    /// `"operator"` for the general thread or direct messages.
    pub task_id: TaskName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Present on button clicks, e.g. `"allow:T1"` / `"deny:T1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    pub chat_message_id: ChatMessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<ChatMessageId>,
    /// Raw payload of the replied-to message, for commands that operate on
    /// prior messages. Opaque to the core — interpreted by the command
    /// handler, which is out of scope for this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_payload: Option<Value>,
}

impl IncomingMessage {
    /// Parse a button callback of the form `"allow:<id>"` / `"deny:<id>"`.
    pub fn parse_permission_callback(&self) -> Option<(crate::permission::Decision, &str)> {
        let data = self.callback_data.as_deref()?;
        let (prefix, id) = data.split_once(':')?;
        let decision = match prefix {
            "allow" => crate::permission::Decision::Allow,
            "deny" => crate::permission::Decision::Deny,
            _ => return None,
        };
        Some((decision, id))
    }

    pub fn is_command(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.starts_with('/'))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
