use super::*;
use foreman_agent::fake::FakeAgentProcess;
use foreman_agent::AgentProcessHandle;
use foreman_core::task::{Task, TaskType};
use foreman_core::{AgentSessionId, ChatThreadId, TaskName};
use foreman_registry::Registry;
use foreman_wire::event::{AgentEvent, SystemEvent};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex as StdMutex;
use tempfile::tempdir;

struct FakeSpawner {
    next_pid: AtomicU32,
    spawned: StdMutex<Vec<std::sync::Arc<FakeAgentProcess>>>,
}

impl FakeSpawner {
    fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self { next_pid: AtomicU32::new(100), spawned: StdMutex::new(Vec::new()) })
    }

    fn last(&self) -> std::sync::Arc<FakeAgentProcess> {
        self.spawned.lock().unwrap().last().cloned().expect("a process was spawned")
    }
}

#[async_trait::async_trait]
impl AgentSpawner for FakeSpawner {
    async fn spawn(
        &self,
        _cwd: &std::path::Path,
        _allowed_tools: Option<&[String]>,
    ) -> Result<(std::sync::Arc<dyn AgentProcessHandle>, AgentSessionId), foreman_agent::AgentProcessError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let session_id = AgentSessionId::from(format!("sess-{pid}"));
        let process = FakeAgentProcess::new(session_id.clone(), pid);
        self.spawned.lock().unwrap().push(process.clone());
        Ok((process, session_id))
    }

    async fn resume(
        &self,
        _cwd: &std::path::Path,
        session_id: &AgentSessionId,
        _allowed_tools: Option<&[String]>,
    ) -> Result<std::sync::Arc<dyn AgentProcessHandle>, foreman_agent::AgentProcessError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let process = FakeAgentProcess::new(session_id.clone(), pid);
        self.spawned.lock().unwrap().push(process.clone());
        Ok(process)
    }
}

fn make_registry() -> (std::sync::Arc<Registry>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let registry = Registry::open(dir.path().join("registry.json"));
    (std::sync::Arc::new(registry), dir)
}

fn add_task(registry: &Registry, name: &str, dir: &std::path::Path) {
    let task = Task::new_operator(dir.to_path_buf(), ChatThreadId::from("thread-1"), 0);
    let mut task = task;
    task.name = TaskName::from(name);
    task.task_type = TaskType::Session;
    registry.add_task(task).unwrap();
}

#[tokio::test]
async fn spawn_registers_process_and_forwards_initial_prompt() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner.clone(), registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();

    assert!(supervisor.is_running(&name).await);
    assert_eq!(spawner.last().sent_messages(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn spawn_twice_for_same_name_is_rejected() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner, registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();
    let err = supervisor.spawn(&name, dir.path(), "again", None).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning(_)));
}

#[tokio::test]
async fn events_from_the_agent_are_multiplexed_with_the_task_name() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner.clone(), registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();

    let process = spawner.last();
    process.push_event(AgentEvent::System(SystemEvent {
        subtype: "init".to_string(),
        session_id: AgentSessionId::from("sess-1"),
        tools: vec![],
        model: None,
        extra: serde_json::Value::Null,
    }));

    let (event_name, event) = supervisor.next_event().await.expect("an event");
    assert_eq!(event_name, name);
    assert!(matches!(event, SupervisorEvent::Agent(AgentEvent::System(_))));
}

#[tokio::test]
async fn crash_is_surfaced_and_clears_the_in_memory_entry() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner.clone(), registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();
    spawner.last().crash();

    let (event_name, event) = supervisor.next_event().await.expect("a crash event");
    assert_eq!(event_name, name);
    assert!(matches!(event, SupervisorEvent::Crashed { .. }));
}

#[tokio::test]
async fn requested_stop_does_not_synthesize_a_crash_event() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner.clone(), registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();
    supervisor.stop(&name).await;

    // The fake's stop() closes the events channel exactly the way a crash
    // does, so only the supervisor's own "stopping" bookkeeping can tell
    // the two apart. Give the monitor a moment to observe the closed
    // channel and confirm it stayed quiet.
    let event = tokio::time::timeout(Duration::from_millis(200), supervisor.next_event()).await;
    assert!(event.is_err(), "a requested stop must not surface a Crashed event");
}

#[tokio::test]
async fn send_resurrects_a_task_whose_process_is_no_longer_tracked() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    let supervisor = Supervisor::new(spawner.clone(), registry);

    let name = TaskName::from("alpha");
    supervisor.spawn(&name, dir.path(), "hello", None).await.unwrap();
    supervisor.stop(&name).await;

    let sent = supervisor.send(&name, "are you there").await.unwrap();
    assert!(sent);
}

#[tokio::test]
async fn send_to_an_unknown_task_fails() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    let supervisor = Supervisor::new(spawner, registry);

    let err = supervisor.send(&TaskName::from("ghost"), "hi").await.unwrap_err();
    assert!(matches!(err, SupervisorError::UnknownTask(_)));
}

#[tokio::test]
async fn cleanup_crashed_clears_dead_pids_while_keeping_the_session_id() {
    let spawner = FakeSpawner::new();
    let (registry, dir) = make_registry();
    add_task(&registry, "alpha", dir.path());
    registry
        .update_task_session_tracking(
            "alpha",
            Some(AgentSessionId::from("sess-dead")),
            Some(Some(999_999)),
            None,
        )
        .unwrap();
    let supervisor = Supervisor::new(spawner, registry.clone());

    let cleared = supervisor.cleanup_crashed().await;
    assert_eq!(cleared, vec![TaskName::from("alpha")]);

    let task = registry.get_task("alpha").unwrap();
    assert_eq!(task.pid, None);
    assert_eq!(task.agent_session_id, Some(AgentSessionId::from("sess-dead")));
}
