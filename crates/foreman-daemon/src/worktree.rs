// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git-worktree creation and teardown for [`TaskType::Worktree`](foreman_core::task::TaskType)
//! tasks. The decision to use a worktree at all is the Worker Lifecycle's
//! this module only shells out to `git`.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// `git -C <repo> worktree add -b <branch> <path> <start_point>`.
pub async fn create_worktree(
    repo: &Path,
    path: &Path,
    branch: &str,
    start_point: &str,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo)
        .args(["worktree", "add", "-b", branch])
        .arg(path)
        .arg(start_point)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    run(cmd, "git worktree add").await
}

/// `git -C <repo> worktree remove --force <path>`, best-effort: a missing
/// repo or an already-removed worktree is not an error, since cleanup must
/// proceed regardless (cleanup is best-effort past the stop step).
pub async fn remove_worktree(repo: &Path, path: &Path) {
    if !repo.exists() {
        let _ = tokio::fs::remove_dir_all(path).await;
        return;
    }
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo).args(["worktree", "remove", "--force"]).arg(path);
    if run(cmd, "git worktree remove").await.is_err() {
        let _ = tokio::fs::remove_dir_all(path).await;
    }
}

async fn run(mut cmd: Command, label: &'static str) -> std::io::Result<()> {
    let output = tokio::time::timeout(GIT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, label))??;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(std::io::Error::other(format!("{label} failed: {stderr}")))
}
