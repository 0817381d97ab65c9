// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon Orchestrator: wires the registry, supervisor, broker, and
//! frontend together and drives the four concurrent loops that make up the
//! daemon's steady state. `main.rs` owns process-level concerns (the pid
//! file, the process group, signal handlers, the broker's HTTP server); this
//! module owns the bootstrap of the operator task and the loops themselves.

use crate::error::DaemonError;
use crate::worker_lifecycle::WorkerLifecycle;
use foreman_broker::PermissionBroker;
use foreman_core::ids::TaskName;
use foreman_core::task::Task;
use foreman_core::{Decision, IncomingMessage};
use foreman_frontend::{Button, Frontend};
use foreman_registry::Registry;
use foreman_supervisor::{Supervisor, SupervisorError, SupervisorEvent};
use foreman_wire::AgentEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Wall-clock bound on draining the operator's init turn.
pub const OPERATOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Orchestrator {
    supervisor: Arc<Supervisor>,
    broker: Arc<PermissionBroker>,
    frontend: Arc<dyn Frontend>,
    registry: Arc<Registry>,
    lifecycle: Arc<WorkerLifecycle>,
}

impl Orchestrator {
    pub fn new(
        supervisor: Arc<Supervisor>,
        broker: Arc<PermissionBroker>,
        frontend: Arc<dyn Frontend>,
        registry: Arc<Registry>,
        lifecycle: Arc<WorkerLifecycle>,
    ) -> Self {
        Self { supervisor, broker, frontend, registry, lifecycle }
    }

    /// The Worker Lifecycle instance, for the crash-recovery scan
    /// `main.rs` runs at startup and for any external command handler
    /// wired in later.
    pub fn lifecycle(&self) -> &Arc<WorkerLifecycle> {
        &self.lifecycle
    }

    /// Ensure the operator's registry row and chat thread exist, then spawn
    /// or resume its process. Idempotent across restarts: a prior
    /// `agent_session_id` is resumed rather than starting a fresh session.
    pub async fn bootstrap_operator(&self, operator_path: &PathBuf) -> Result<(), DaemonError> {
        std::fs::create_dir_all(operator_path)
            .map_err(|source| DaemonError::PidFile { path: operator_path.clone(), source })?;

        let name = TaskName::operator();
        let task = match self.registry.get_task(name.as_str()) {
            Some(task) => task,
            None => {
                let thread_id = self.frontend.create_thread(&name).await?;
                let task = Task::new_operator(operator_path.clone(), thread_id, now_ms());
                self.registry.add_task(task.clone())?;
                task
            }
        };

        match &task.agent_session_id {
            Some(session_id) => {
                self.supervisor.resume(&name, &task.path, session_id, None).await?;
            }
            None => {
                self.supervisor
                    .spawn(&name, &task.path, OPERATOR_SEED_PROMPT, None)
                    .await?;
            }
        }
        Ok(())
    }

    /// Consume events from the multiplexed stream up to and including the
    /// operator's first `result` event, without forwarding any of it to the
    /// frontend. Must
    /// run to completion before [`Self::run`] starts the agent-events loop,
    /// or the seed prompt's response interleaves with the first real reply.
    pub async fn drain_operator_init(&self) -> Result<(), DaemonError> {
        let operator = TaskName::operator();
        let drained = tokio::time::timeout(OPERATOR_DRAIN_TIMEOUT, async {
            loop {
                match self.supervisor.next_event().await {
                    Some((name, SupervisorEvent::Agent(AgentEvent::Result(result))))
                        if name == operator =>
                    {
                        debug!(subtype = %result.subtype, "operator init turn drained");
                        return;
                    }
                    Some((name, SupervisorEvent::Agent(AgentEvent::System(sys)))) if name == operator => {
                        if sys.is_init() {
                            let _ = self.registry.update_task_session_tracking(
                                operator.as_str(),
                                Some(sys.session_id.clone()),
                                None,
                                None,
                            );
                        }
                    }
                    // Anything else arriving before the operator's own
                    // result (another task can't exist yet, but a crash
                    // synthetic could) is dropped silently during drain.
                    Some(_) => continue,
                    None => return,
                }
            }
        })
        .await;

        drained.map_err(|_elapsed| DaemonError::OperatorDrainTimeout)
    }

    /// Run the three steady-state loops (the broker's HTTP server runs on
    /// its own background worker and is not one of these) until the
    /// supervisor and broker are both shut down.
    pub async fn run(self: Arc<Self>) {
        let agent_events = {
            let this = self.clone();
            tokio::spawn(async move { this.agent_events_loop().await })
        };
        let incoming_messages = {
            let this = self.clone();
            tokio::spawn(async move { this.incoming_messages_loop().await })
        };
        let permission_notifications = {
            let this = self.clone();
            tokio::spawn(async move { this.permission_notifications_loop().await })
        };

        let _ = tokio::join!(agent_events, incoming_messages, permission_notifications);
    }

    pub async fn shutdown(&self) {
        self.supervisor.stop_all().await;
        self.broker.shutdown();
    }

    async fn agent_events_loop(&self) {
        while let Some((name, event)) = self.supervisor.next_event().await {
            match event {
                SupervisorEvent::Agent(AgentEvent::System(sys)) => {
                    if sys.is_init() {
                        info!(task = %name, session_id = %sys.session_id, "agent init");
                        let _ = self.registry.update_task_session_tracking(
                            name.as_str(),
                            Some(sys.session_id),
                            None,
                            None,
                        );
                    }
                }
                SupervisorEvent::Agent(AgentEvent::Assistant(assistant)) => {
                    for block in &assistant.message.content {
                        if let foreman_wire::ContentBlock::Thinking { thinking } = block {
                            debug!(task = %name, chars = thinking.len(), "agent thinking");
                        }
                    }
                    let text = assistant.message.text();
                    if !text.is_empty() {
                        if let Err(err) = self.frontend.send(&name, &escape_for_frontend(&text), None).await {
                            warn!(task = %name, %err, "failed to forward assistant text");
                        }
                    }
                    // tool_use blocks become permission requests via the
                    // HTTP hook; nothing to do with them here.
                }
                SupervisorEvent::Agent(AgentEvent::Result(result)) => {
                    debug!(task = %name, subtype = %result.subtype, turns = ?result.num_turns, "turn complete");
                }
                SupervisorEvent::Agent(AgentEvent::User(_)) => {}
                SupervisorEvent::Crashed { reason } => {
                    error!(task = %name, %reason, "agent process crashed");
                    let message = format!(
                        "⚠️ task `{}` crashed: {}",
                        escape_for_frontend(name.as_str()),
                        escape_for_frontend(&reason)
                    );
                    if let Err(err) = self.frontend.send(&name, &message, None).await {
                        warn!(task = %name, %err, "failed to notify frontend of crash");
                    }
                }
            }
        }
    }

    async fn incoming_messages_loop(&self) {
        while let Some(message) = self.frontend.next_incoming().await {
            self.handle_incoming(message).await;
        }
    }

    async fn handle_incoming(&self, message: IncomingMessage) {
        if let Some((decision, tool_use_id)) = message.parse_permission_callback() {
            self.handle_permission_callback(&message, decision, tool_use_id).await;
            return;
        }
        if message.is_command() {
            // The human-facing command parser and its prompt-rendering
            // helpers are an external collaborator; the core only
            // guarantees that a recognized command short-circuits routing.
            debug!(task = %message.task_id, "command message received; no core command handler installed");
            return;
        }
        let Some(text) = message.text.as_deref() else { return };
        self.route(&message.task_id, text).await;
    }

    async fn handle_permission_callback(&self, message: &IncomingMessage, decision: Decision, tool_use_id: &str) {
        let tool_use_id = foreman_core::ids::ToolUseId::from(tool_use_id.to_string());
        let snapshot = self.broker.get(&tool_use_id);
        let reason = "user decision";
        if !self.broker.respond(&tool_use_id, decision, reason) {
            debug!(tool_use_id = %tool_use_id, "permission callback for an already-resolved or unknown request");
            return;
        }
        let Some(chat_message_id) = snapshot.and_then(|p| p.chat_message_id) else { return };
        let label = match decision {
            Decision::Allow => "✅ Allowed",
            Decision::Deny => "❌ Denied",
        };
        if let Err(err) = self.frontend.update(&message.task_id, &chat_message_id, Some(label), Some(vec![])).await {
            warn!(task = %message.task_id, %err, "failed to update permission prompt buttons");
        }
    }

    /// The router: try the addressed task first, falling back to the
    /// operator on an unknown-task error so a message to a task that no
    /// longer exists still reaches a live agent instead of being dropped.
    async fn route(&self, task_id: &TaskName, text: &str) {
        if !task_id.is_operator() {
            match self.supervisor.send(task_id, text).await {
                Ok(true) => return,
                Ok(false) => {
                    warn!(task = %task_id, "send reached a dead process; dropping");
                    return;
                }
                Err(SupervisorError::UnknownTask(_)) => {}
                Err(err) => {
                    error!(task = %task_id, %err, "router failed to deliver message");
                    return;
                }
            }
        }
        let operator = TaskName::operator();
        match self.supervisor.send(&operator, text).await {
            Ok(true) => {}
            Ok(false) => warn!("operator send reached a dead process; dropping"),
            Err(err) => error!(%err, "router failed to deliver message to the operator"),
        }
    }

    async fn permission_notifications_loop(&self) {
        while let Some((tool_use_id, session_id)) = self.broker.next_notification().await {
            let Some(pending) = self.broker.get(&tool_use_id) else {
                debug!(%tool_use_id, "notification for a request that already resolved");
                continue;
            };
            if pending.chat_message_id.is_some() {
                // Exactly-once chat prompts: a racing second notification
                // for the same id short-circuits here.
                continue;
            }
            let Some(task_id) = self.resolve_task_for_session(&session_id) else {
                warn!(%tool_use_id, session = %session_id, "permission request orphaned by a session compaction; dropping notification");
                continue;
            };
            let content = format_permission_prompt(&pending.tool_name, &pending.tool_input, &pending.cwd);
            let buttons = Button::allow_deny(tool_use_id.as_str());
            match self.frontend.send(&task_id, &content, Some(buttons)).await {
                Ok(chat_message_id) => self.broker.register_chat_message(&tool_use_id, chat_message_id),
                Err(err) => warn!(%tool_use_id, %err, "failed to post permission prompt"),
            }
        }
    }

    /// Resolve the chat thread's owning task for a `session_id`. Returns
    /// `None` when the session maps to no task — an internal compaction may
    /// have reassigned the agent's session id out from under a permission
    /// request that was already pending. Forwarding an orphaned request to
    /// the operator would surface a decision about another task's tool call
    /// in the wrong conversational context, so the caller drops it instead
    /// and relies on the pending request's own timeout path in the broker.
    fn resolve_task_for_session(&self, session_id: &foreman_core::AgentSessionId) -> Option<TaskName> {
        self.registry
            .get_chat_thread_for_session(session_id)
            .and_then(|thread_id| self.registry.find_task_by_chat_thread(&thread_id))
            .map(|(name, _)| name)
    }
}

const OPERATOR_SEED_PROMPT: &str =
    "You are the operator. Greet the human briefly and wait for their first instruction.";

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Escape text bound for the frontend's markup dialect (Telegram's
/// MarkdownV2: <https://core.telegram.org/bots/api#markdownv2-style>).
/// Applied to agent-authored or otherwise untrusted text before it is
/// interpolated into a message that also carries our own deliberate
/// formatting (backticks, code fences), so a tool-use id or file path full
/// of underscores or brackets can't break out of it.
pub(crate) fn escape_for_frontend(text: &str) -> String {
    const SPECIAL: &[char] =
        &['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\'];
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Render a pending permission as the two-button chat prompt. `tool_name`
/// and `cwd` come from the agent and are escaped; the surrounding backticks
/// and code fence are our own formatting and are left alone.
fn format_permission_prompt(tool_name: &str, tool_input: &serde_json::Value, cwd: &str) -> String {
    format!(
        "🔧 `{}`\ncwd: `{}`\ninput: ```\n{}\n```",
        escape_for_frontend(tool_name),
        escape_for_frontend(cwd),
        escape_for_frontend(&tool_input.to_string()),
    )
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
