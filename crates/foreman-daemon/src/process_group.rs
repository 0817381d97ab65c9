// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-group setup and signal handling.
//!
//! The daemon makes itself a new process group leader so every agent child
//! it spawns (which inherits the group) dies with it even under a hard
//! kill. SIGINT/SIGTERM translate to an immediate `_exit(0)` after a
//! best-effort pid-file cleanup and a SIGTERM to the whole group — no
//! graceful unwind of the cooperative scheduler is attempted.

use crate::pidfile::PidFile;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{setpgid, Pid};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Make this process its own group leader. Must run before any agent child
/// is spawned so every child inherits the new group.
pub fn become_group_leader() {
    if let Err(err) = setpgid(Pid::from_pid(0), Pid::from_pid(0)) {
        warn!(%err, "failed to become process group leader; children may outlive the daemon on a hard kill");
    }
}

/// SIGTERM the entire process group, best-effort. Never signals group 0
/// (which would mean "no group was ever set").
pub fn kill_group() {
    // kill(2) with a negative pid targets the process group.
    if let Ok(group_pid) = nix::unistd::getpgid(None) {
        let _ = kill(Pid::from_raw(-group_pid.as_raw()), Signal::SIGTERM);
    }
}

/// Install SIGINT/SIGTERM handlers that clean up the pid file, SIGTERM the
/// process group, and `_exit(0)` immediately. Spawns a background task on
/// the current Tokio runtime; the caller's own shutdown path never runs
/// concurrently with it because the handler calls `std::process::exit`.
pub fn install_signal_handlers(pid_file: Arc<PidFile>) {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to install SIGINT handler");
            return;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
        pid_file.release();
        kill_group();
        std::process::exit(0);
    });
}
