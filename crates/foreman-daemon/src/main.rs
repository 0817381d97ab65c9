// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `foremand`: the supervisor daemon binary. Process-level concerns only
//! (logging, the pid file, the process group, the operator bootstrap, the
//! broker's HTTP server, signal handlers); the actual behavior lives in
//! `foreman_daemon`'s library modules.

use foreman_broker::{http as broker_http, PermissionBroker};
use foreman_daemon::{pidfile, process_group, Config, Orchestrator, TelegramFrontend, WorkerLifecycle};
use foreman_registry::Registry;
use foreman_supervisor::{RealSpawner, Supervisor};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("foremand: {err}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&config.log_dir);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("foremand: failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "foremand exiting with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), foreman_daemon::DaemonError> {
    // Process-group leadership and the pid file must both be in place
    // before any agent child is spawned.
    let pid_file = Arc::new(pidfile::PidFile::acquire(&config.pid_path)?);
    process_group::become_group_leader();
    process_group::install_signal_handlers(pid_file.clone());

    for dir in [&config.state_dir, &config.sessions_root, &config.worktrees_root] {
        std::fs::create_dir_all(dir)
            .map_err(|source| foreman_daemon::DaemonError::StateDirectory { path: dir.clone(), source })?;
    }

    let registry = Arc::new(Registry::open(&config.registry_path));
    let config_store = Arc::new(foreman_registry::Config::open(&config.config_store_path));

    let spawner = Arc::new(RealSpawner::new(config.agent_program.clone(), config.agent_startup_timeout));
    let supervisor = Arc::new(Supervisor::new(spawner, registry.clone()));
    let broker = PermissionBroker::new();
    let frontend = TelegramFrontend::new(
        config.credentials.bot_token.clone(),
        config.credentials.chat_id.clone(),
        config_store,
        registry.clone(),
    );
    let lifecycle = Arc::new(WorkerLifecycle::new(
        supervisor.clone(),
        registry.clone(),
        frontend.clone(),
        config.worktrees_root.clone(),
    ));
    let orchestrator =
        Arc::new(Orchestrator::new(supervisor, broker.clone(), frontend.clone(), registry.clone(), lifecycle.clone()));

    // Install the broker's notification channel before the HTTP listener
    // opens, so no hook request can race ahead of a consumer on the
    // cooperative side.
    let broker_http_handle = {
        let broker = broker.clone();
        let addr = config.broker_addr;
        tokio::spawn(async move {
            if let Err(err) = broker_http::serve(broker, addr).await {
                error!(%err, "permission broker HTTP server exited");
            }
        })
    };

    let (recovered, stuck) = lifecycle.recover_from_markers(&[config.sessions_root.clone(), config.worktrees_root.clone()]);
    for name in &recovered {
        info!(task = %name, "registry row rebuilt from marker file");
    }
    for marker in &stuck {
        warn!(name = %marker.pending_name, since = marker.pending_since, "task stuck mid-creation; marker never completed");
    }
    let crashed = registry.get_all_tasks();
    for (name, task) in crashed {
        if let Some(pid) = task.pid {
            if !process_is_alive(pid) {
                let _ = registry.update_task_session_tracking(name.as_str(), None, Some(None), None);
                warn!(task = %name, "cleared stale pid for a task not currently live");
            }
        }
    }

    frontend.spawn_poll_loop();

    orchestrator.bootstrap_operator(&config.sessions_root.join("operator")).await?;
    orchestrator.drain_operator_init().await?;
    info!("operator init turn drained; starting steady-state loops");

    orchestrator.run().await;

    broker_http_handle.abort();
    pid_file.release();
    Ok(())
}

fn process_is_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

/// File logging under `log_dir`, daily-rolled, plus `RUST_LOG`-controlled
/// filtering; returns the guard that must stay alive for the life of the
/// process or buffered lines are dropped on exit.
fn init_logging(log_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);
    let file_appender = tracing_appender::rolling::daily(log_dir, "foremand.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    guard
}
