// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Supervisor: the pool of agent processes keyed by task name, the
//! event multiplexer, and resurrection-on-send.

use crate::error::SupervisorError;
use crate::spawner::AgentSpawner;
use foreman_agent::AgentProcessHandle;
use foreman_core::ids::TaskName;
use foreman_core::task::TaskStatus;
use foreman_registry::Registry;
use foreman_wire::AgentEvent;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// One item on the multiplexed event stream, prefixed with its task name.
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    Agent(AgentEvent),
    /// Synthesized when a process's event stream ends unexpectedly (not via
    /// a requested `stop`) — the monitor task's stand-in for an exception.
    Crashed { reason: String },
}

struct Entry {
    handle: Arc<dyn AgentProcessHandle>,
    monitor: tokio::task::JoinHandle<()>,
    /// Set before `stop()` closes the process's stdin so the monitor can
    /// tell a requested stop from a crash when `events.recv()` returns
    /// `None` for either reason.
    stopping: Arc<AtomicBool>,
}

pub struct Supervisor {
    spawner: Arc<dyn AgentSpawner>,
    registry: Arc<Registry>,
    processes: Arc<Mutex<HashMap<TaskName, Entry>>>,
    event_tx: mpsc::UnboundedSender<(TaskName, SupervisorEvent)>,
    event_rx: Mutex<mpsc::UnboundedReceiver<(TaskName, SupervisorEvent)>>,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(spawner: Arc<dyn AgentSpawner>, registry: Arc<Registry>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            spawner,
            registry,
            processes: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            event_rx: Mutex::new(event_rx),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn spawn(
        &self,
        name: &TaskName,
        cwd: &Path,
        initial_prompt: &str,
        allowed_tools: Option<&[String]>,
    ) -> Result<(), SupervisorError> {
        let mut processes = self.processes.lock().await;
        if processes.contains_key(name) {
            return Err(SupervisorError::AlreadyRunning(name.clone()));
        }
        let (handle, session_id) = self
            .spawner
            .spawn(cwd, allowed_tools)
            .await
            .map_err(|source| SupervisorError::Spawn { task: name.clone(), source })?;

        if self.registry.get_task(name.as_str()).is_some() {
            let _ = self.registry.update_task_session_tracking(
                name.as_str(),
                Some(session_id),
                Some(Some(handle.pid())),
                Some(TaskStatus::Active),
            );
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let monitor = self.spawn_monitor(name.clone(), handle.clone(), stopping.clone()).await;
        processes.insert(name.clone(), Entry { handle: handle.clone(), monitor, stopping });
        drop(processes);

        handle.send_message(initial_prompt).await;
        Ok(())
    }

    pub async fn resume(
        &self,
        name: &TaskName,
        cwd: &Path,
        session_id: &foreman_core::AgentSessionId,
        allowed_tools: Option<&[String]>,
    ) -> Result<(), SupervisorError> {
        let mut processes = self.processes.lock().await;
        if processes.contains_key(name) {
            return Err(SupervisorError::AlreadyRunning(name.clone()));
        }
        let handle = self
            .spawner
            .resume(cwd, session_id, allowed_tools)
            .await
            .map_err(|source| SupervisorError::Spawn { task: name.clone(), source })?;

        let _ = self.registry.update_task_session_tracking(
            name.as_str(),
            Some(session_id.clone()),
            Some(Some(handle.pid())),
            Some(TaskStatus::Active),
        );

        let stopping = Arc::new(AtomicBool::new(false));
        let monitor = self.spawn_monitor(name.clone(), handle.clone(), stopping.clone()).await;
        processes.insert(name.clone(), Entry { handle, monitor, stopping });
        Ok(())
    }

    /// Forward `text` to `name`'s process. Transparently resumes from the
    /// registry's stored `agent_session_id` when the process is absent from
    /// memory but the registry still knows about the task — this is what
    /// makes resurrection work after a crash.
    pub async fn send(&self, name: &TaskName, text: &str) -> Result<bool, SupervisorError> {
        {
            let processes = self.processes.lock().await;
            if let Some(entry) = processes.get(name) {
                if entry.handle.is_running() {
                    return Ok(entry.handle.send_message(text).await);
                }
            }
        }

        let task = self.registry.get_task(name.as_str()).ok_or_else(|| {
            SupervisorError::UnknownTask(name.clone())
        })?;
        let Some(session_id) = task.agent_session_id.clone() else {
            return Err(SupervisorError::UnknownTask(name.clone()));
        };
        self.resume(name, &task.path, &session_id, None).await?;
        let processes = self.processes.lock().await;
        let Some(entry) = processes.get(name) else { return Ok(false) };
        Ok(entry.handle.send_message(text).await)
    }

    pub async fn stop(&self, name: &TaskName) {
        let entry = self.processes.lock().await.remove(name);
        if let Some(entry) = entry {
            // Flip this before closing stdin: the stdout reader closing in
            // response races `monitor.abort()` taking effect, and the
            // monitor must see a requested stop, not a crash, if it wins.
            entry.stopping.store(true, Ordering::SeqCst);
            entry.handle.stop(Duration::from_secs(10)).await;
            entry.monitor.abort();
        }
    }

    pub async fn stop_all(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let names: Vec<TaskName> = self.processes.lock().await.keys().cloned().collect();
        for name in names {
            self.stop(&name).await;
        }
    }

    pub async fn is_running(&self, name: &TaskName) -> bool {
        self.processes.lock().await.get(name).is_some_and(|e| e.handle.is_running())
    }

    pub async fn get(&self, name: &TaskName) -> Option<Arc<dyn AgentProcessHandle>> {
        self.processes.lock().await.get(name).map(|e| e.handle.clone())
    }

    pub async fn list_names(&self) -> Vec<TaskName> {
        self.processes.lock().await.keys().cloned().collect()
    }

    /// Next item on the multiplexed event stream, or `None` once
    /// `stop_all` has been called and nothing further is queued. Polls with
    /// a short timeout so shutdown takes effect quickly.
    pub async fn next_event(&self) -> Option<(TaskName, SupervisorEvent)> {
        loop {
            let mut rx = self.event_rx.lock().await;
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

    /// For each registry row not currently managed in-process, probe its
    /// stored pid with signal 0; clear the pid (keeping `agent_session_id`
    /// so a later `send` can resume it) if the process is gone.
    pub async fn cleanup_crashed(&self) -> Vec<TaskName> {
        let managed: std::collections::HashSet<TaskName> =
            self.processes.lock().await.keys().cloned().collect();
        let mut cleared = Vec::new();
        for (name, task) in self.registry.get_all_tasks() {
            if managed.contains(&name) {
                continue;
            }
            let Some(pid) = task.pid else { continue };
            let alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok();
            if !alive {
                let _ = self.registry.update_task_session_tracking(
                    name.as_str(),
                    None,
                    Some(None),
                    None,
                );
                cleared.push(name);
            }
        }
        cleared
    }

    async fn spawn_monitor(
        &self,
        name: TaskName,
        handle: Arc<dyn AgentProcessHandle>,
        stopping: Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<()> {
        let event_tx = self.event_tx.clone();
        let processes = self.processes.clone();
        tokio::spawn(async move {
            let Some(mut events) = handle.events().await else { return };
            loop {
                match events.recv().await {
                    Some(event) => {
                        if event_tx.send((name.clone(), SupervisorEvent::Agent(event))).is_err() {
                            break;
                        }
                    }
                    None => {
                        // A requested `stop()` also closes this channel, so
                        // only synthesize a crash when nobody asked for the
                        // process to go away.
                        if !stopping.load(Ordering::SeqCst) {
                            let _ = event_tx.send((
                                name.clone(),
                                SupervisorEvent::Crashed { reason: "stdout closed".to_string() },
                            ));
                        }
                        processes.lock().await.remove(&name);
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
