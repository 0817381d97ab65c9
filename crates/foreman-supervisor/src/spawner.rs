// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstracts "start an agent process" so the supervisor can be driven by a
//! real child process or, in tests, a scripted fake — mirroring the
//! teacher's split between a real adapter and a fake one behind a trait.

use async_trait::async_trait;
use foreman_agent::{resume_agent, spawn_agent, AgentProcessError, AgentProcessHandle};
use foreman_core::ids::AgentSessionId;
use foreman_wire::ArgvBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait AgentSpawner: Send + Sync {
    async fn spawn(
        &self,
        cwd: &Path,
        allowed_tools: Option<&[String]>,
    ) -> Result<(Arc<dyn AgentProcessHandle>, AgentSessionId), AgentProcessError>;

    async fn resume(
        &self,
        cwd: &Path,
        session_id: &AgentSessionId,
        allowed_tools: Option<&[String]>,
    ) -> Result<Arc<dyn AgentProcessHandle>, AgentProcessError>;
}

/// Spawns the real agent binary (e.g. `claude`) with the shared argv contract.
pub struct RealSpawner {
    program: String,
    startup_timeout: Duration,
}

impl RealSpawner {
    pub fn new(program: impl Into<String>, startup_timeout: Duration) -> Self {
        Self { program: program.into(), startup_timeout }
    }
}

#[async_trait]
impl AgentSpawner for RealSpawner {
    async fn spawn(
        &self,
        cwd: &Path,
        allowed_tools: Option<&[String]>,
    ) -> Result<(Arc<dyn AgentProcessHandle>, AgentSessionId), AgentProcessError> {
        let mut builder = ArgvBuilder::new();
        if let Some(tools) = allowed_tools {
            builder = builder.allowed_tools(tools.iter().cloned());
        }
        let argv = builder.build();
        let (process, session_id) =
            spawn_agent(&self.program, &argv, cwd, self.startup_timeout).await?;
        Ok((Arc::new(process), session_id))
    }

    async fn resume(
        &self,
        cwd: &Path,
        session_id: &AgentSessionId,
        allowed_tools: Option<&[String]>,
    ) -> Result<Arc<dyn AgentProcessHandle>, AgentProcessError> {
        let mut builder = ArgvBuilder::new().resume(session_id.clone());
        if let Some(tools) = allowed_tools {
            builder = builder.allowed_tools(tools.iter().cloned());
        }
        let argv = builder.build();
        let process =
            resume_agent(&self.program, &argv, cwd, self.startup_timeout, session_id).await?;
        Ok(Arc::new(process))
    }
}
