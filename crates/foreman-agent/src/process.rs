// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One OS child speaking JSONL over stdout, wrapped for spawn/resume, typed
//! event delivery, and graceful-then-forceful termination.

use crate::error::AgentProcessError;
use foreman_core::ids::AgentSessionId;
use foreman_wire::{encode_user_text, parse_event_line, AgentEvent};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

/// One live agent child process.
///
/// Not restartable: once `events()` has been taken and the process has
/// exited, a new [`AgentProcess`] must be spawned (or resumed) to continue.
pub struct AgentProcess {
    pid: u32,
    stdin: Mutex<Option<ChildStdin>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<AgentEvent>>>,
    session_id: Arc<Mutex<Option<AgentSessionId>>>,
    running: Arc<AtomicBool>,
    kill_tx: mpsc::UnboundedSender<()>,
    stdout_task: tokio::task::JoinHandle<()>,
    stderr_task: tokio::task::JoinHandle<()>,
}

/// Spawn `program argv[..]` in `cwd` and wait for its first `init` event.
///
/// The first event is not consumed from the public event stream —
/// it stays queued in the channel `events()` later drains — `start`'s
/// return value is simply observed from it via a side channel.
pub async fn spawn_agent(
    program: &str,
    argv: &[String],
    cwd: &Path,
    startup_timeout: Duration,
) -> Result<(AgentProcess, AgentSessionId), AgentProcessError> {
    let mut command = Command::new(program);
    command
        .args(argv)
        .current_dir(cwd)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);
    #[cfg(target_os = "linux")]
    set_pdeathsig_on_parent_exit(&mut command);

    let mut child = command.spawn().map_err(AgentProcessError::SpawnFailed)?;
    let pid = child.id().unwrap_or(0);
    let stdin = child.stdin.take();
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(AgentProcessError::SpawnFailed(std::io::Error::other(
            "child stdout/stderr were not piped",
        )));
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (init_tx, init_rx) = oneshot::channel::<AgentSessionId>();
    let session_id = Arc::new(Mutex::new(None));

    let stdout_task = tokio::spawn(read_stdout(stdout, events_tx, init_tx, session_id.clone()));
    let stderr_task = tokio::spawn(read_stderr(stderr, pid));

    let running = Arc::new(AtomicBool::new(true));
    let (kill_tx, kill_rx) = mpsc::unbounded_channel();
    tokio::spawn(reap(child, kill_rx, running.clone()));

    let first_id = match tokio::time::timeout(startup_timeout, init_rx).await {
        Ok(Ok(id)) => id,
        Ok(Err(_)) => return Err(AgentProcessError::StdoutClosedBeforeInit),
        Err(_) => return Err(AgentProcessError::StartupTimeout(startup_timeout)),
    };

    Ok((
        AgentProcess {
            pid,
            stdin: Mutex::new(stdin),
            events_rx: Mutex::new(Some(events_rx)),
            session_id,
            running,
            kill_tx,
            stdout_task,
            stderr_task,
        },
        first_id,
    ))
}

/// So an orphaned child dies with the daemon even if a hard kill skips the
/// process-group SIGTERM cleanup. `pre_exec`'s own contract is the only
/// reason this needs `unsafe`; the signal itself is set through nix's safe
/// `prctl` wrapper, not a raw libc call.
#[cfg(target_os = "linux")]
fn set_pdeathsig_on_parent_exit(command: &mut Command) {
    #[allow(unsafe_code)]
    unsafe {
        command.pre_exec(|| {
            nix::sys::prctl::set_pdeathsig(Some(nix::sys::signal::Signal::SIGTERM))
                .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
        });
    }
}

/// Same as [`spawn_agent`] but asserts the resumed id matches what the
/// caller expected (the registry's stored `agent_session_id`).
pub async fn resume_agent(
    program: &str,
    argv: &[String],
    cwd: &Path,
    startup_timeout: Duration,
    expected_session_id: &AgentSessionId,
) -> Result<AgentProcess, AgentProcessError> {
    let (process, actual) = spawn_agent(program, argv, cwd, startup_timeout).await?;
    if &actual != expected_session_id {
        return Err(AgentProcessError::SessionIdMismatch {
            expected: expected_session_id.as_str().to_string(),
            actual: actual.as_str().to_string(),
        });
    }
    Ok(process)
}

async fn read_stdout(
    stdout: tokio::process::ChildStdout,
    events_tx: mpsc::UnboundedSender<AgentEvent>,
    init_tx: oneshot::Sender<AgentSessionId>,
    session_id: Arc<Mutex<Option<AgentSessionId>>>,
) {
    let mut init_tx = Some(init_tx);
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "agent stdout read error");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let event = match parse_event_line(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, line = %line, "skipping malformed agent stdout line");
                continue;
            }
        };
        if let AgentEvent::System(sys) = &event {
            if sys.is_init() {
                *session_id.lock().await = Some(sys.session_id.clone());
                if let Some(tx) = init_tx.take() {
                    let _ = tx.send(sys.session_id.clone());
                }
            }
        }
        if events_tx.send(event).is_err() {
            break;
        }
    }
    // Dropping events_tx here closes the channel: events() sees a terminal None.
}

async fn read_stderr(stderr: tokio::process::ChildStderr, pid: u32) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(pid, "agent stderr: {line}"),
            Ok(None) | Err(_) => break,
        }
    }
}

async fn reap(
    mut child: tokio::process::Child,
    mut kill_rx: mpsc::UnboundedReceiver<()>,
    running: Arc<AtomicBool>,
) {
    tokio::select! {
        _ = child.wait() => {}
        _ = kill_rx.recv() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
    running.store(false, Ordering::SeqCst);
}

impl AgentProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn session_id(&self) -> Option<AgentSessionId> {
        self.session_id.lock().await.clone()
    }

    /// Writes one JSONL line and flushes. `false` if the process is not
    /// running or the pipe is broken — never terminates the process.
    pub async fn send_message(&self, text: &str) -> bool {
        if !self.is_running() {
            return false;
        }
        let Ok(line) = encode_user_text(text) else { return false };
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else { return false };
        if stdin.write_all(line.as_bytes()).await.is_err() {
            return false;
        }
        if stdin.write_all(b"\n").await.is_err() {
            return false;
        }
        stdin.flush().await.is_ok()
    }

    /// Takes ownership of the event stream. Returns `None` on a second call
    /// — this process is not restartable.
    pub async fn events(&self) -> Option<mpsc::UnboundedReceiver<AgentEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Close stdin, wait up to `timeout` for graceful exit, then SIGKILL.
    /// Idempotent: a second call on an already-stopped process returns
    /// immediately.
    pub async fn stop(&self, timeout: Duration) {
        self.stdin.lock().await.take();
        if !self.is_running() {
            return;
        }
        let deadline = tokio::time::Instant::now() + timeout;
        while self.is_running() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        if self.is_running() {
            let _ = self.kill_tx.send(());
        }
        for _ in 0..200 {
            if !self.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.stdout_task.abort();
        self.stderr_task.abort();
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
