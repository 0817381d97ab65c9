// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Daemon Orchestrator crate: single-instance guard, process-group
//! setup, the operator bootstrap/drain sequence, the Worker Lifecycle, and
//! the [`TelegramFrontend`] adapter that makes `foremand` a runnable
//! binary. `main.rs` is the thin process entry point; everything with real
//! behavior lives in a module here so it's covered by `#[cfg(test)]`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pidfile;
pub mod process_group;
pub mod telegram;
pub mod worker_lifecycle;
pub mod worktree;

pub use config::Config;
pub use error::{ConfigError, DaemonError, WorkerLifecycleError};
pub use orchestrator::Orchestrator;
pub use pidfile::PidFile;
pub use telegram::TelegramFrontend;
pub use worker_lifecycle::{NewWorker, WorkerLifecycle};
