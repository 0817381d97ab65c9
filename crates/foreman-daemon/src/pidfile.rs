// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance guard: read the PID file, probe the stored pid with
//! signal 0 to tell a stale file from a live daemon, write our own pid,
//! and remove it on exit.

use crate::error::DaemonError;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::{Path, PathBuf};

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Acquire the guard or fail with [`DaemonError::AlreadyRunning`] if a
    /// live process already holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let path = path.into();
        if let Some(pid) = read_live_pid(&path) {
            return Err(DaemonError::AlreadyRunning(pid));
        }
        std::fs::write(&path, format!("{}\n", std::process::id()))
            .map_err(|source| DaemonError::PidFile { path: path.clone(), source })?;
        Ok(Self { path })
    }

    pub fn release(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// `Some(pid)` if the file names a pid that answers to signal 0; `None` if
/// the file is absent, unparseable, or names a dead process (a stale file
/// left by an unclean kill).
fn read_live_pid(path: &Path) -> Option<u32> {
    let contents = std::fs::read_to_string(path).ok()?;
    let pid: i32 = contents.trim().parse().ok()?;
    kill(Pid::from_raw(pid), None).ok().map(|()| pid as u32)
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
