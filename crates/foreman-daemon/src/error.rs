// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Fatal at startup, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing frontend credentials file at {path}: {source}")]
    MissingCredentials { path: PathBuf, source: std::io::Error },
    #[error("malformed frontend credentials file at {path}: {source}")]
    MalformedCredentials { path: PathBuf, source: serde_json::Error },
}

/// Fatal at startup (another instance already running) or surfaced during the
/// daemon's own lifecycle.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("another daemon instance is already running (pid {0})")]
    AlreadyRunning(u32),
    #[error("failed to read or write pid file at {path}: {source}")]
    PidFile { path: PathBuf, source: std::io::Error },
    #[error("failed to create state directory at {path}: {source}")]
    StateDirectory { path: PathBuf, source: std::io::Error },
    #[error("permission broker failed: {0}")]
    Broker(#[from] foreman_broker::BrokerError),
    #[error("failed to spawn or resume the operator: {0}")]
    Operator(#[from] foreman_supervisor::SupervisorError),
    #[error("frontend error while bootstrapping the operator: {0}")]
    Frontend(#[from] foreman_frontend::FrontendError),
    #[error("registry storage error: {0}")]
    Storage(#[from] foreman_registry::StorageError),
    #[error("timed out draining the operator's initialization turn")]
    OperatorDrainTimeout,
}

/// Worker Lifecycle failures. The caller rolls back any prior side
/// effects (chat thread, worktree, registry row) on any variant raised
/// after those side effects were created.
#[derive(Debug, Error)]
pub enum WorkerLifecycleError {
    #[error("task name {0} is already in use")]
    NameInUse(foreman_core::ids::TaskName),
    #[error("unknown task {0}")]
    UnknownTask(foreman_core::ids::TaskName),
    #[error("frontend error: {0}")]
    Frontend(#[from] foreman_frontend::FrontendError),
    #[error("registry storage error: {0}")]
    Storage(#[from] foreman_registry::StorageError),
    #[error("supervisor error: {0}")]
    Supervisor(#[from] foreman_supervisor::SupervisorError),
    #[error("failed to create worktree at {path}: {source}")]
    WorktreeCreate { path: PathBuf, source: std::io::Error },
    #[error("failed to delete worktree at {path}: {source}")]
    WorktreeDelete { path: PathBuf, source: std::io::Error },
    #[error("failed to write marker file at {path}: {source}")]
    Marker { path: PathBuf, source: std::io::Error },
}
