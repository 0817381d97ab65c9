// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A tool-invocation waiting on a human allow/deny decision.

use foreman_core::ids::{AgentSessionId, ChatMessageId, ToolUseId};
use foreman_core::permission::PermissionDecision;
use serde_json::Value;
use tokio::sync::oneshot;

/// A read-only snapshot of a pending request, for callers (the daemon's
/// notifications loop) that only need to render a prompt and never touch
/// the reply slot directly.
#[derive(Debug, Clone)]
pub struct PendingPermission {
    pub tool_use_id: ToolUseId,
    pub tool_name: String,
    pub tool_input: Value,
    pub session_id: AgentSessionId,
    pub cwd: String,
    pub chat_message_id: Option<ChatMessageId>,
}

/// The broker-internal bookkeeping entry. Owns the one-shot reply slot: a
/// single-slot channel consumed exactly once, either by [`crate::PermissionBroker::respond`]
/// or by the request's own timeout path. Never model this as a shared queue:
/// a second waiter could steal the first's reply.
pub(crate) struct Entry {
    pub tool_name: String,
    pub tool_input: Value,
    pub session_id: AgentSessionId,
    pub cwd: String,
    pub reply_tx: Option<oneshot::Sender<PermissionDecision>>,
    pub chat_message_id: Option<ChatMessageId>,
}

impl Entry {
    pub fn snapshot(&self, tool_use_id: ToolUseId) -> PendingPermission {
        PendingPermission {
            tool_use_id,
            tool_name: self.tool_name.clone(),
            tool_input: self.tool_input.clone(),
            session_id: self.session_id.clone(),
            cwd: self.cwd.clone(),
            chat_message_id: self.chat_message_id.clone(),
        }
    }
}
