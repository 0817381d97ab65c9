// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Lifecycle: create/pause/resume/clean up a named task atop
//! the supervisor, the registry, and the frontend's chat thread, plus the
//! crash-recovery scan over marker files.
//!
//! The create path follows the pending-marker protocol exactly:
//! write the pending marker, create the chat thread, post a welcome,
//! complete the marker, add the registry row, then spawn the agent — each
//! step after the pending marker rolls back everything before it on
//! failure, in reverse order.

use crate::error::WorkerLifecycleError;
use crate::worktree;
use foreman_core::ids::{ChatThreadId, TaskName};
use foreman_core::task::{is_reserved_name, Task, TaskStatus, TaskType};
use foreman_frontend::Frontend;
use foreman_registry::{
    complete_pending, rebuild_registry_from_markers, remove_marker, write_pending, CompletedMarker,
    PendingMarker, Registry,
};
use foreman_supervisor::Supervisor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const WORKTREE_STARTING_POINT: &str = "HEAD";

/// What a new worker is bound to.
pub enum NewWorker {
    /// An existing directory the agent runs in as-is.
    Session { path: PathBuf },
    /// A fresh git worktree to be created under `worktrees_root`.
    Worktree { repo: PathBuf, branch: String },
}

pub struct WorkerLifecycle {
    supervisor: Arc<Supervisor>,
    registry: Arc<Registry>,
    frontend: Arc<dyn Frontend>,
    worktrees_root: PathBuf,
}

impl WorkerLifecycle {
    pub fn new(
        supervisor: Arc<Supervisor>,
        registry: Arc<Registry>,
        frontend: Arc<dyn Frontend>,
        worktrees_root: PathBuf,
    ) -> Self {
        Self { supervisor, registry, frontend, worktrees_root }
    }

    /// Create a new task: collision-check the name, provision its working
    /// directory, run the pending-marker protocol, then spawn the agent
    /// with `initial_prompt`. Rolls back every side effect created after
    /// the pending marker on any failure.
    pub async fn spawn_worker(
        &self,
        name: &TaskName,
        worker: NewWorker,
        description: &str,
        initial_prompt: &str,
    ) -> Result<Task, WorkerLifecycleError> {
        if is_reserved_name(name.as_str()) || self.registry.name_exists(name.as_str()) {
            return Err(WorkerLifecycleError::NameInUse(name.clone()));
        }

        let (task_type, path, repo) = match worker {
            NewWorker::Session { path } => (TaskType::Session, path, None),
            NewWorker::Worktree { repo, branch } => {
                let path = self.worktrees_root.join(format!("{name}-{}", nanoid::nanoid!(6)));
                worktree::create_worktree(&repo, &path, &branch, WORKTREE_STARTING_POINT)
                    .await
                    .map_err(|source| WorkerLifecycleError::WorktreeCreate {
                        path: path.clone(),
                        source,
                    })?;
                (TaskType::Worktree, path, Some(repo))
            }
        };

        seed_worker_files(&path, name, description);

        let since_ms = now_ms();
        write_pending(&path, name, since_ms)
            .map_err(|source| WorkerLifecycleError::Marker { path: path.clone(), source })?;

        let thread_id = match self.frontend.create_thread(name).await {
            Ok(id) => id,
            Err(err) => {
                self.teardown_directory(task_type, repo.as_deref(), &path).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self.frontend.send(name, &welcome_message(name), None).await {
            warn!(%name, %err, "failed to post worker welcome message");
        }

        let completed = CompletedMarker {
            name: name.clone(),
            task_type,
            chat_thread_id: thread_id.clone(),
            created_at: since_ms,
            repo: repo.clone(),
            status: TaskStatus::Active,
        };
        if let Err(source) = complete_pending(&path, completed) {
            self.rollback(name, &thread_id, task_type, repo.as_deref(), &path).await;
            return Err(WorkerLifecycleError::Marker { path: path.clone(), source });
        }

        let task = Task {
            name: name.clone(),
            task_type,
            path: path.clone(),
            repo: repo.clone(),
            chat_thread_id: thread_id.clone(),
            agent_session_id: None,
            pid: None,
            status: TaskStatus::Active,
            created_at_ms: since_ms,
        };
        if let Err(err) = self.registry.add_task(task.clone()) {
            self.rollback(name, &thread_id, task_type, repo.as_deref(), &path).await;
            return Err(err.into());
        }

        if let Err(err) = self.supervisor.spawn(name, &path, initial_prompt, None).await {
            let _ = self.registry.remove_task(name.as_str());
            self.rollback(name, &thread_id, task_type, repo.as_deref(), &path).await;
            return Err(err.into());
        }

        info!(%name, path = %path.display(), "worker spawned");
        Ok(task)
    }

    /// Stop the agent process and mark the task paused, in both the
    /// registry and the marker file.
    pub async fn pause(&self, name: &TaskName) -> Result<(), WorkerLifecycleError> {
        let task = self.require_task(name)?;
        self.supervisor.stop(name).await;
        self.registry.update_task_session_tracking(
            name.as_str(),
            None,
            Some(None),
            Some(TaskStatus::Paused),
        )?;
        self.rewrite_marker(&task, TaskStatus::Paused)?;
        info!(%name, "worker paused");
        Ok(())
    }

    /// Resume a paused (or crashed) task: resume from its stored
    /// `agent_session_id` if one exists, otherwise spawn fresh.
    pub async fn resume(&self, name: &TaskName) -> Result<(), WorkerLifecycleError> {
        let task = self.require_task(name)?;
        match &task.agent_session_id {
            Some(session_id) => {
                self.supervisor.resume(name, &task.path, session_id, None).await?;
            }
            None => {
                self.supervisor
                    .spawn(name, &task.path, "Resuming this task. Summarize where things left off.", None)
                    .await?;
            }
        }
        self.registry.update_task_session_tracking(name.as_str(), None, None, Some(TaskStatus::Active))?;
        self.rewrite_marker(&task, TaskStatus::Active)?;
        info!(%name, "worker resumed");
        Ok(())
    }

    /// Tear down a task entirely: stop the process, close (or archive) the
    /// chat thread, delete the worktree if any, remove the marker, remove
    /// the registry row. `operator` is never cleaned up by this path.
    pub async fn cleanup(&self, name: &TaskName, archive: bool) -> Result<(), WorkerLifecycleError> {
        if name.is_operator() {
            return Err(WorkerLifecycleError::UnknownTask(name.clone()));
        }
        let task = self.require_task(name)?;
        self.supervisor.stop(name).await;
        if let Err(err) = self.frontend.close_thread(&task.chat_thread_id, archive).await {
            warn!(%name, %err, "failed to close chat thread during cleanup");
        }
        if task.task_type == TaskType::Worktree {
            if let Some(repo) = &task.repo {
                worktree::remove_worktree(repo, &task.path).await;
            }
        }
        let _ = remove_marker(&task.path);
        self.registry.remove_task(name.as_str())?;
        info!(%name, "worker cleaned up");
        Ok(())
    }

    /// Crash-recovery scan: rebuild any registry row missing for a
    /// completed marker under `roots`, and report any pending markers stuck
    /// mid-creation so a human can diagnose them.
    pub fn recover_from_markers(&self, roots: &[PathBuf]) -> (Vec<TaskName>, Vec<PendingMarker>) {
        rebuild_registry_from_markers(roots, &self.registry)
    }

    fn require_task(&self, name: &TaskName) -> Result<Task, WorkerLifecycleError> {
        self.registry.get_task(name.as_str()).ok_or_else(|| WorkerLifecycleError::UnknownTask(name.clone()))
    }

    fn rewrite_marker(&self, task: &Task, status: TaskStatus) -> Result<(), WorkerLifecycleError> {
        let mut completed = CompletedMarker::from_task(task);
        completed.status = status;
        complete_pending(&task.path, completed)
            .map_err(|source| WorkerLifecycleError::Marker { path: task.path.clone(), source })
    }

    async fn rollback(
        &self,
        name: &TaskName,
        thread_id: &ChatThreadId,
        task_type: TaskType,
        repo: Option<&Path>,
        path: &Path,
    ) {
        warn!(%name, "rolling back worker creation after a failure");
        if let Err(err) = self.frontend.close_thread(thread_id, false).await {
            warn!(%name, %err, "failed to close chat thread during rollback");
        }
        self.teardown_directory(task_type, repo, path).await;
    }

    async fn teardown_directory(&self, task_type: TaskType, repo: Option<&Path>, path: &Path) {
        if task_type == TaskType::Worktree {
            if let Some(repo) = repo {
                worktree::remove_worktree(repo, path).await;
            }
        }
        let _ = remove_marker(path);
    }
}

fn welcome_message(name: &TaskName) -> String {
    format!(
        "Task `{}` created. I'll summarize what I'm doing here and wait for your go-ahead.",
        crate::orchestrator::escape_for_frontend(name.as_str())
    )
}

const CLAUDE_LOCAL_MD: &str = "CLAUDE.local.md";
const TODO_LOCAL_MD: &str = "TODO.local.md";

/// Seed the two operator-maintained scratch files a task directory carries
/// alongside the marker file. The daemon never parses either one; this
/// runs on first provisioning only (spawn, never resume/resurrection) and
/// never overwrites an existing file, so accumulated learnings and TODOs
/// survive restarts. Both are best-effort: a write failure here is logged
/// and never fails the spawn.
fn seed_worker_files(path: &Path, name: &TaskName, description: &str) {
    let claude_local = path.join(CLAUDE_LOCAL_MD);
    if !claude_local.exists() {
        let contents = format!("# Task: {name}\n\n{description}\n\n## Learnings\n\n");
        if let Err(err) = std::fs::write(&claude_local, contents) {
            warn!(%name, %err, "failed to seed CLAUDE.local.md");
        }
    }

    let todo_local = path.join(TODO_LOCAL_MD);
    if !todo_local.exists() {
        if let Err(err) = std::fs::write(&todo_local, "# TODO\n\n") {
            warn!(%name, %err, "failed to seed TODO.local.md");
        }
    }
}

/// Append a line to `TODO.local.md`. Best-effort: a write failure here
/// never blocks whatever triggered the append.
pub fn append_todo(path: &Path, line: &str) {
    let todo_local = path.join(TODO_LOCAL_MD);
    let needs_header = !todo_local.exists();
    let mut contents = String::new();
    if needs_header {
        contents.push_str("# TODO\n\n");
    }
    contents.push_str(line);
    contents.push('\n');
    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&todo_local)
        .and_then(|mut f| {
            use std::io::Write;
            f.write_all(contents.as_bytes())
        });
    if let Err(err) = result {
        warn!(path = %todo_local.display(), %err, "failed to append to TODO.local.md");
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "worker_lifecycle_tests.rs"]
mod tests;
