// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable task name -> [`Task`] mapping.

use crate::error::StorageError;
use crate::store::AtomicJsonStore;
use foreman_core::ids::{AgentSessionId, ChatThreadId, TaskName};
use foreman_core::task::{Task, TaskStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryDoc {
    #[serde(default)]
    tasks: IndexMap<TaskName, Task>,
}

pub struct Registry {
    store: AtomicJsonStore<RegistryDoc>,
}

impl Registry {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self { store: AtomicJsonStore::open(path.as_ref()) }
    }

    pub fn add_task(&self, task: Task) -> Result<(), StorageError> {
        let name = task.name.clone();
        self.store.update(|doc| {
            doc.tasks.insert(name.clone(), task.clone());
        })?;
        Ok(())
    }

    pub fn get_task(&self, name: &str) -> Option<Task> {
        self.store.read().tasks.get(name).cloned()
    }

    pub fn remove_task(&self, name: &str) -> Result<Option<Task>, StorageError> {
        let mut removed = None;
        self.store.update(|doc| {
            removed = doc.tasks.shift_remove(name);
        })?;
        Ok(removed)
    }

    pub fn get_all_tasks(&self) -> Vec<(TaskName, Task)> {
        self.store.read().tasks.into_iter().collect()
    }

    pub fn find_task_by_chat_thread(&self, id: &ChatThreadId) -> Option<(TaskName, Task)> {
        self.store.read().tasks.into_iter().find(|(_, task)| &task.chat_thread_id == id)
    }

    /// Linear scan is acceptable: task counts are small.
    pub fn get_chat_thread_for_session(&self, session_id: &AgentSessionId) -> Option<ChatThreadId> {
        self.store
            .read()
            .tasks
            .into_iter()
            .find(|(_, task)| task.agent_session_id.as_ref() == Some(session_id))
            .map(|(_, task)| task.chat_thread_id)
    }

    /// Partial update that no-ops on unknown name.
    pub fn update_task_session_tracking(
        &self,
        name: &str,
        session_id: Option<AgentSessionId>,
        pid: Option<Option<u32>>,
        status: Option<TaskStatus>,
    ) -> Result<(), StorageError> {
        self.store.update(|doc| {
            let Some(task) = doc.tasks.get_mut(name) else { return };
            if let Some(session_id) = session_id {
                task.agent_session_id = Some(session_id);
            }
            if let Some(pid) = pid {
                task.pid = pid;
            }
            if let Some(status) = status {
                task.status = status;
            }
        })?;
        Ok(())
    }

    pub fn name_exists(&self, name: &str) -> bool {
        self.store.read().tasks.contains_key(name)
    }

    pub fn chat_thread_in_use(&self, id: &ChatThreadId) -> bool {
        self.store.read().tasks.into_iter().any(|(_, task)| &task.chat_thread_id == id)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
