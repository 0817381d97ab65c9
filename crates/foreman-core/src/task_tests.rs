// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample() -> Task {
    Task::new_operator(PathBuf::from("/tmp/op"), ChatThreadId::from("general"), 1_000)
}

#[test]
fn operator_task_has_reserved_name() {
    let task = sample();
    assert!(task.name.is_operator());
    assert!(is_reserved_name(task.name.as_str()));
}

#[test]
fn fresh_task_has_not_completed_first_turn() {
    let task = sample();
    assert!(!task.has_completed_first_turn());
    assert!(!task.is_running());
}

#[test]
fn task_running_requires_active_status_and_pid() {
    let mut task = sample();
    task.pid = Some(123);
    assert!(!task.is_running(), "still paused-by-default until status flips");
    task.status = TaskStatus::Active;
    assert!(task.is_running());
    task.pid = None;
    assert!(!task.is_running());
}

#[test]
fn round_trips_through_json() {
    let mut task = sample();
    task.agent_session_id = Some(AgentSessionId::from("sess-1"));
    let json = serde_json::to_string(&task).unwrap();
    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name, task.name);
    assert_eq!(back.agent_session_id, task.agent_session_id);
}

#[test]
fn worker_names_are_not_reserved() {
    assert!(!is_reserved_name("fix-login-bug"));
}
