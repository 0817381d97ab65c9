// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque identifiers threaded through the supervisor.

/// Name the operator task is always registered under. Reserved: no other
/// task may take this name (see [`crate::task::is_reserved_name`]).
pub const OPERATOR_TASK_NAME: &str = "operator";

crate::opaque_id! {
    /// A task's human-chosen, unique name.
    pub struct TaskName;
}

crate::opaque_id! {
    /// External chat-thread/topic identifier the frontend uses to isolate
    /// one task's messages from another's.
    pub struct ChatThreadId;
}

crate::opaque_id! {
    /// External chat-message identifier, e.g. to edit/delete a prompt or to
    /// resolve a permission decision by the message a button was attached to.
    pub struct ChatMessageId;
}

crate::opaque_id! {
    /// The id an agent binary assigns on first start and expects on resume.
    pub struct AgentSessionId;
}

crate::opaque_id! {
    /// Opaque id the agent mints for one `tool_use` block; assumed unique
    /// for the lifetime of the daemon (the agent never reuses one).
    pub struct ToolUseId;
}

impl TaskName {
    pub fn operator() -> Self {
        Self(OPERATOR_TASK_NAME.to_string())
    }

    pub fn is_operator(&self) -> bool {
        self.0 == OPERATOR_TASK_NAME
    }
}
