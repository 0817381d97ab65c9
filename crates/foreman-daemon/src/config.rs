// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: fixed-path state, a fixed-path credentials file,
//! and the handful of environment variables that legitimately vary per
//! deployment.

use crate::error::ConfigError;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Frontend credentials loaded from a fixed home-directory JSON document.
/// Missing or unreadable -> the daemon refuses to start.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub registry_path: PathBuf,
    pub config_store_path: PathBuf,
    pub pid_path: PathBuf,
    pub log_dir: PathBuf,
    pub sessions_root: PathBuf,
    pub worktrees_root: PathBuf,
    pub credentials: Credentials,
    pub broker_addr: SocketAddr,
    pub agent_program: String,
    pub agent_startup_timeout: Duration,
}

impl Config {
    /// Load every fixed-path document and apply environment overrides.
    /// Fails fatally if the credentials file is
    /// missing or unparseable.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir();
        let credentials_path = credentials_path();
        let credentials = load_credentials(&credentials_path)?;

        Ok(Self {
            registry_path: state_dir.join("registry.json"),
            config_store_path: state_dir.join("config.json"),
            pid_path: pid_path(),
            log_dir: state_dir.join("logs"),
            sessions_root: state_dir.join("sessions"),
            worktrees_root: state_dir.join("worktrees"),
            credentials,
            broker_addr: broker_addr(),
            agent_program: agent_program(),
            agent_startup_timeout: Duration::from_secs(30),
            state_dir,
        })
    }
}

fn load_credentials(path: &std::path::Path) -> Result<Credentials, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::MissingCredentials { path: path.to_path_buf(), source })?;
    serde_json::from_str(&contents)
        .map_err(|source| ConfigError::MalformedCredentials { path: path.to_path_buf(), source })
}

/// `$FOREMAN_STATE_DIR` > `$XDG_STATE_HOME/foreman` > `~/.local/state/foreman`.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FOREMAN_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = std::env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("foreman");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".local/state/foreman")
}

/// `$FOREMAN_CREDENTIALS_PATH` > `~/.config/foreman/credentials.json`.
fn credentials_path() -> PathBuf {
    if let Ok(path) = std::env::var("FOREMAN_CREDENTIALS_PATH") {
        return PathBuf::from(path);
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config/foreman/credentials.json")
}

/// A fixed path under `/tmp`; overridable for tests that must not
/// collide on a shared file (run those serially regardless, see
/// `serial_test` in this crate's dev-dependencies).
fn pid_path() -> PathBuf {
    if let Ok(path) = std::env::var("FOREMAN_PID_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from("/tmp/foremand.pid")
}

fn broker_addr() -> SocketAddr {
    let host: IpAddr = std::env::var("FOREMAN_BROKER_HOST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let port: u16 =
        std::env::var("FOREMAN_BROKER_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8787);
    SocketAddr::new(host, port)
}

fn agent_program() -> String {
    std::env::var("FOREMAN_AGENT_PROGRAM").unwrap_or_else(|_| "claude".to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
