// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use foreman_agent::AgentProcessError;
use foreman_core::ids::TaskName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("task {0} is already running")]
    AlreadyRunning(TaskName),
    #[error("unknown task {0}")]
    UnknownTask(TaskName),
    #[error("failed to spawn agent for {task}: {source}")]
    Spawn { task: TaskName, #[source] source: AgentProcessError },
}
