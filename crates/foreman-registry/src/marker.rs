// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marker files: the source of truth under catastrophe.
//!
//! One small JSON file dropped in every task's working directory. The
//! crash-safe creation protocol writes a *pending* form before the chat
//! thread is created, then overwrites it with the *completed* form after —
//! so a crash mid-creation leaves an unambiguous, diagnosable trace.

use crate::registry::Registry;
use foreman_core::ids::{ChatThreadId, TaskName};
use foreman_core::task::{Task, TaskStatus, TaskType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MARKER_FILENAME: &str = ".task-marker.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMarker {
    pub pending_name: TaskName,
    pub pending_since: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMarker {
    pub name: TaskName,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub chat_thread_id: ChatThreadId,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<PathBuf>,
    pub status: TaskStatus,
}

impl CompletedMarker {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            task_type: task.task_type,
            chat_thread_id: task.chat_thread_id.clone(),
            created_at: task.created_at_ms,
            repo: task.repo.clone(),
            status: task.status,
        }
    }
}

/// A marker file's contents at whatever point its creation protocol has
/// reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Marker {
    Completed(CompletedMarker),
    Pending(PendingMarker),
}

fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILENAME)
}

pub fn write_pending(dir: &Path, name: &TaskName, since_ms: u64) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let marker =
        Marker::Pending(PendingMarker { pending_name: name.clone(), pending_since: since_ms });
    atomic_write(&marker_path(dir), &marker)
}

pub fn complete_pending(dir: &Path, completed: CompletedMarker) -> std::io::Result<()> {
    atomic_write(&marker_path(dir), &Marker::Completed(completed))
}

pub fn read(dir: &Path) -> Option<Marker> {
    let content = std::fs::read_to_string(marker_path(dir)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn remove(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(marker_path(dir)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn is_managed(dir: &Path) -> bool {
    marker_path(dir).exists()
}

fn atomic_write<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

/// Walk a set of directory roots for marker files, one directory level
/// deep (each task's working directory is a direct child of a configured
/// root — e.g. the worktrees root, or the sessions root).
pub fn scan_roots(roots: &[PathBuf]) -> Vec<(PathBuf, Marker)> {
    let mut found = Vec::new();
    for root in roots {
        let Ok(entries) = std::fs::read_dir(root) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(marker) = read(&path) {
                found.push((path, marker));
            }
        }
    }
    found
}

/// Rebuild any registry row missing for a completed marker found under
/// `roots`. Pending markers are left alone (they describe an in-progress
/// creation, not a recoverable task) and reported back to the caller so a
/// human can diagnose a long-stuck recovery.
pub fn rebuild_registry_from_markers(
    roots: &[PathBuf],
    registry: &Registry,
) -> (Vec<TaskName>, Vec<PendingMarker>) {
    let mut rebuilt = Vec::new();
    let mut stuck_pending = Vec::new();
    for (dir, marker) in scan_roots(roots) {
        match marker {
            Marker::Completed(completed) => {
                if registry.get_task(completed.name.as_str()).is_some() {
                    continue;
                }
                let task = Task {
                    name: completed.name.clone(),
                    task_type: completed.task_type,
                    path: dir,
                    repo: completed.repo,
                    chat_thread_id: completed.chat_thread_id,
                    agent_session_id: None,
                    pid: None,
                    status: completed.status,
                    created_at_ms: completed.created_at,
                };
                if registry.add_task(task).is_ok() {
                    rebuilt.push(completed.name);
                }
            }
            Marker::Pending(pending) => stuck_pending.push(pending),
        }
    }
    (rebuilt, stuck_pending)
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
