use super::*;
use foreman_agent::fake::FakeAgentProcess;
use foreman_agent::AgentProcessHandle;
use foreman_core::AgentSessionId;
use foreman_frontend::fake::FakeFrontend;
use foreman_registry::{read_marker, Marker};
use foreman_supervisor::AgentSpawner;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex as StdMutex;
use tempfile::tempdir;

struct FakeSpawner {
    next_pid: AtomicU32,
    fail_next: StdMutex<bool>,
    spawned: StdMutex<Vec<Arc<FakeAgentProcess>>>,
}

impl FakeSpawner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: AtomicU32::new(100),
            fail_next: StdMutex::new(false),
            spawned: StdMutex::new(Vec::new()),
        })
    }

    fn fail_next_spawn(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl AgentSpawner for FakeSpawner {
    async fn spawn(
        &self,
        _cwd: &Path,
        _allowed_tools: Option<&[String]>,
    ) -> Result<(Arc<dyn AgentProcessHandle>, AgentSessionId), foreman_agent::AgentProcessError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(foreman_agent::AgentProcessError::SpawnFailed(std::io::Error::other("boom")));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let session_id = AgentSessionId::from(format!("sess-{pid}"));
        let process = FakeAgentProcess::new(session_id.clone(), pid);
        self.spawned.lock().unwrap().push(process.clone());
        Ok((process, session_id))
    }

    async fn resume(
        &self,
        _cwd: &Path,
        session_id: &AgentSessionId,
        _allowed_tools: Option<&[String]>,
    ) -> Result<Arc<dyn AgentProcessHandle>, foreman_agent::AgentProcessError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let process = FakeAgentProcess::new(session_id.clone(), pid);
        self.spawned.lock().unwrap().push(process.clone());
        Ok(process)
    }
}

fn harness() -> (WorkerLifecycle, Arc<FakeSpawner>, Arc<FakeFrontend>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let spawner = FakeSpawner::new();
    let registry = Arc::new(Registry::open(dir.path().join("registry.json")));
    let supervisor = Arc::new(Supervisor::new(spawner.clone(), registry.clone()));
    let frontend = Arc::new(FakeFrontend::new());
    let worktrees_root = dir.path().join("worktrees");
    let lifecycle =
        WorkerLifecycle::new(supervisor, registry, frontend.clone(), worktrees_root);
    (lifecycle, spawner, frontend, dir)
}

#[tokio::test]
async fn spawn_worker_creates_thread_registry_row_and_process() {
    let (lifecycle, _spawner, frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");

    let task = lifecycle
        .spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start")
        .await
        .unwrap();

    assert_eq!(task.name, name);
    assert_eq!(task.task_type, TaskType::Session);
    assert!(!frontend.threads().is_empty());
    assert!(frontend.sent().iter().any(|m| m.task_id == name));
    let marker = read_marker(&path).expect("marker written");
    assert!(matches!(marker, Marker::Completed(_)));
}

#[tokio::test]
async fn spawn_worker_seeds_claude_and_todo_scratch_files() {
    let (lifecycle, _spawner, _frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");
    std::fs::create_dir_all(&path).unwrap();

    lifecycle
        .spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start")
        .await
        .unwrap();

    let claude_local = std::fs::read_to_string(path.join("CLAUDE.local.md")).unwrap();
    assert!(claude_local.contains("test task"));
    let todo_local = std::fs::read_to_string(path.join("TODO.local.md")).unwrap();
    assert_eq!(todo_local, "# TODO\n\n");
}

#[tokio::test]
async fn spawn_worker_rejects_reserved_and_duplicate_names() {
    let (lifecycle, _spawner, _frontend, dir) = harness();
    let reserved = TaskName::from("operator");
    let err = lifecycle
        .spawn_worker(&reserved, NewWorker::Session { path: dir.path().join("x") }, "test task", "start")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerLifecycleError::NameInUse(_)));

    let name = TaskName::from("alpha");
    lifecycle
        .spawn_worker(&name, NewWorker::Session { path: dir.path().join("alpha") }, "test task", "start")
        .await
        .unwrap();
    let err = lifecycle
        .spawn_worker(&name, NewWorker::Session { path: dir.path().join("alpha-2") }, "test task", "start")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerLifecycleError::NameInUse(_)));
}

#[tokio::test]
async fn spawn_worker_rolls_back_thread_and_marker_on_spawn_failure() {
    let (lifecycle, spawner, frontend, dir) = harness();
    spawner.fail_next_spawn();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");

    let err = lifecycle
        .spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerLifecycleError::Supervisor(_)));
    assert!(frontend.threads().is_empty(), "thread must be closed on rollback");
    assert!(read_marker(&path).is_none(), "marker must be removed on rollback");
    assert!(lifecycle.require_task(&name).is_err());
}

#[tokio::test]
async fn pause_stops_the_process_and_marks_paused() {
    let (lifecycle, _spawner, _frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");
    lifecycle.spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start").await.unwrap();

    lifecycle.pause(&name).await.unwrap();

    let task = lifecycle.require_task(&name).unwrap();
    assert_eq!(task.status, TaskStatus::Paused);
    assert!(task.pid.is_none());
    let Marker::Completed(marker) = read_marker(&path).unwrap() else { panic!("expected completed marker") };
    assert_eq!(marker.status, TaskStatus::Paused);
}

#[tokio::test]
async fn resume_restarts_from_stored_session_id() {
    let (lifecycle, spawner, _frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");
    lifecycle.spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start").await.unwrap();
    lifecycle.pause(&name).await.unwrap();
    let before = spawner.spawned.lock().unwrap().len();

    lifecycle.resume(&name).await.unwrap();

    assert_eq!(spawner.spawned.lock().unwrap().len(), before + 1);
    let task = lifecycle.require_task(&name).unwrap();
    assert_eq!(task.status, TaskStatus::Active);
}

#[tokio::test]
async fn cleanup_refuses_the_operator_task() {
    let (lifecycle, _spawner, _frontend, _dir) = harness();
    let operator = TaskName::operator();
    let err = lifecycle.cleanup(&operator, false).await.unwrap_err();
    assert!(matches!(err, WorkerLifecycleError::UnknownTask(_)));
}

#[tokio::test]
async fn cleanup_removes_thread_marker_and_registry_row() {
    let (lifecycle, _spawner, frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");
    lifecycle.spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start").await.unwrap();

    lifecycle.cleanup(&name, false).await.unwrap();

    assert!(frontend.threads().is_empty());
    assert!(read_marker(&path).is_none());
    assert!(lifecycle.require_task(&name).is_err());
}

#[tokio::test]
async fn recover_from_markers_rebuilds_registry_rows() {
    let (lifecycle, _spawner, _frontend, dir) = harness();
    let name = TaskName::from("alpha");
    let path = dir.path().join("alpha-session");
    lifecycle.spawn_worker(&name, NewWorker::Session { path: path.clone() }, "test task", "start").await.unwrap();
    lifecycle.registry.remove_task(name.as_str()).unwrap();
    assert!(lifecycle.require_task(&name).is_err());

    let (rebuilt, stuck) = lifecycle.recover_from_markers(&[dir.path().to_path_buf()]);

    assert_eq!(rebuilt, vec![name.clone()]);
    assert!(stuck.is_empty());
    assert!(lifecycle.require_task(&name).is_ok());
}
