// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's pending table and the HTTP-caller's synchronous rendezvous.

use crate::pending::{Entry, PendingPermission};
use foreman_core::ids::{AgentSessionId, ChatMessageId, ToolUseId};
use foreman_core::permission::{is_auto_allowed, Decision, PermissionDecision};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Default wait for a human decision before the HTTP call returns a deny
/// (the default permission wait is 300 s).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Permission Broker: single-process state shared between the HTTP hook
/// handler (running on a preemptively scheduled worker) and the daemon's
/// cooperative notifications loop.
pub struct PermissionBroker {
    pending: Mutex<HashMap<ToolUseId, Entry>>,
    message_to_tool: Mutex<HashMap<ChatMessageId, ToolUseId>>,
    notifications_tx: mpsc::UnboundedSender<(ToolUseId, AgentSessionId)>,
    notifications_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(ToolUseId, AgentSessionId)>>,
    shutdown: AtomicBool,
    timeout: Duration,
}

impl PermissionBroker {
    pub fn new() -> Arc<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Construct with a non-default wait, for tests that want to exercise
    /// the timeout path without sleeping 300 real seconds.
    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            message_to_tool: Mutex::new(HashMap::new()),
            notifications_tx,
            notifications_rx: tokio::sync::Mutex::new(notifications_rx),
            shutdown: AtomicBool::new(false),
            timeout,
        })
    }

    /// Synchronous request/response rendezvous. Blocks on a one-shot
    /// reply slot owned by the pending record for up to `timeout`; never
    /// holds `pending`'s lock across the wait.
    pub async fn request(
        &self,
        tool_name: String,
        tool_input: Value,
        tool_use_id: ToolUseId,
        session_id: AgentSessionId,
        cwd: String,
    ) -> PermissionDecision {
        if is_auto_allowed(&tool_name) {
            debug!(tool = %tool_name, "auto-allowed");
            return PermissionDecision::allow("auto");
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            pending.insert(
                tool_use_id.clone(),
                Entry {
                    tool_name,
                    tool_input,
                    session_id: session_id.clone(),
                    cwd,
                    reply_tx: Some(reply_tx),
                    chat_message_id: None,
                },
            );
        }

        if self.notifications_tx.send((tool_use_id.clone(), session_id)).is_err() {
            warn!(tool_use_id = %tool_use_id, "no consumer for permission notifications");
        }

        let decision = match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_canceled)) => {
                PermissionDecision::deny("broker dropped the reply channel before responding")
            }
            Err(_elapsed) => {
                PermissionDecision::deny("permission request timed out waiting for a human decision")
            }
        };

        self.cleanup(&tool_use_id);
        decision
    }

    /// Resolve a pending request by its agent-assigned id. Idempotent-ish:
    /// the first call fulfils the reply slot and returns `true`; any call
    /// after that (whether the id was already answered or never existed)
    /// returns `false`.
    pub fn respond(&self, tool_use_id: &ToolUseId, decision: Decision, reason: impl Into<String>) -> bool {
        let tx = {
            let mut pending = self.pending.lock();
            let Some(entry) = pending.get_mut(tool_use_id) else { return false };
            entry.reply_tx.take()
        };
        let Some(tx) = tx else { return false };
        let _ = tx.send(PermissionDecision { decision, reason: reason.into() });
        true
    }

    /// Resolve via the reverse mapping installed by [`Self::register_chat_message`].
    pub fn respond_by_message_id(
        &self,
        chat_message_id: &ChatMessageId,
        decision: Decision,
        reason: impl Into<String>,
    ) -> bool {
        let tool_use_id = self.message_to_tool.lock().get(chat_message_id).cloned();
        let Some(tool_use_id) = tool_use_id else { return false };
        self.respond(&tool_use_id, decision, reason)
    }

    /// Record both directions of the tool-use-id <-> chat-message-id
    /// mapping. Called once, right after the prompt is posted, so that a
    /// racing second notification for the same id observes the non-null
    /// field and short-circuits (exactly-once chat prompts).
    pub fn register_chat_message(&self, tool_use_id: &ToolUseId, chat_message_id: ChatMessageId) {
        {
            let mut pending = self.pending.lock();
            if let Some(entry) = pending.get_mut(tool_use_id) {
                entry.chat_message_id = Some(chat_message_id.clone());
            }
        }
        self.message_to_tool.lock().insert(chat_message_id, tool_use_id.clone());
    }

    /// Read-only snapshot of a pending request, for the notifications loop
    /// to render a prompt from.
    pub fn get(&self, tool_use_id: &ToolUseId) -> Option<PendingPermission> {
        self.pending.lock().get(tool_use_id).map(|e| e.snapshot(tool_use_id.clone()))
    }

    /// Next `(tool_use_id, session_id)` pushed by a `request` call, or
    /// `None` once `shutdown` has been called and the channel is drained.
    /// Polls with a short timeout so shutdown takes effect quickly, the
    /// same pattern the supervisor's event multiplexer uses.
    pub async fn next_notification(&self) -> Option<(ToolUseId, AgentSessionId)> {
        loop {
            let mut rx = self.notifications_rx.lock().await;
            match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
                Ok(Some(item)) => return Some(item),
                Ok(None) => return None,
                Err(_elapsed) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return None;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn cleanup(&self, tool_use_id: &ToolUseId) {
        let removed = self.pending.lock().remove(tool_use_id);
        if let Some(entry) = removed {
            if let Some(chat_message_id) = entry.chat_message_id {
                self.message_to_tool.lock().remove(&chat_message_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
