// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Task`] record: the durable name -> state mapping entry.

use crate::ids::{AgentSessionId, ChatThreadId, TaskName, OPERATOR_TASK_NAME};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a task is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// The singleton coordinator. Never destroyed, only stopped/restarted.
    Operator,
    /// Bound to an existing directory; cleanup never touches the directory.
    Session,
    /// Bound to a directory created via a version-control worktree;
    /// cleanup deletes the working directory.
    Worktree,
}

/// Whether a task's agent process is expected to be live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Paused,
}

/// One entry in the registry: everything needed to find, resume, or tear
/// down a task's agent process and its chat thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: TaskName,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub path: PathBuf,
    /// Parent repository path; only meaningful for [`TaskType::Worktree`],
    /// needed to delete the worktree on cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<PathBuf>,
    pub chat_thread_id: ChatThreadId,
    /// Null until the first `init` event; the agent may reassign it after
    /// internal compaction, in which case the supervisor updates in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<AgentSessionId>,
    /// Live process id of the child, or `None` if not running. A paused
    /// task always has `pid: None` (invariant iv).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub status: TaskStatus,
    pub created_at_ms: u64,
}

impl Task {
    pub fn new_operator(path: PathBuf, chat_thread_id: ChatThreadId, created_at_ms: u64) -> Self {
        Self {
            name: TaskName::operator(),
            task_type: TaskType::Operator,
            path,
            repo: None,
            chat_thread_id,
            agent_session_id: None,
            pid: None,
            status: TaskStatus::Active,
            created_at_ms,
        }
    }

    /// Invariant (v): a task whose `agent_session_id` is still null has
    /// never completed its first turn successfully.
    pub fn has_completed_first_turn(&self) -> bool {
        self.agent_session_id.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Active && self.pid.is_some()
    }
}

/// `"operator"` is reserved; every other name is arbitrary but must be
/// collision-checked against the registry before use.
pub fn is_reserved_name(name: &str) -> bool {
    name == OPERATOR_TASK_NAME
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
