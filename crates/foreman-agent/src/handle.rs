// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trait the supervisor programs against, so it can be driven by either
//! a real [`AgentProcess`](crate::AgentProcess) or, in tests, a scripted
//! fake (see [`crate::fake`]).

use async_trait::async_trait;
use foreman_core::ids::AgentSessionId;
use foreman_wire::AgentEvent;
use std::time::Duration;
use tokio::sync::mpsc;

#[async_trait]
pub trait AgentProcessHandle: Send + Sync {
    fn pid(&self) -> u32;
    fn is_running(&self) -> bool;
    async fn session_id(&self) -> Option<AgentSessionId>;
    async fn send_message(&self, text: &str) -> bool;
    async fn events(&self) -> Option<mpsc::UnboundedReceiver<AgentEvent>>;
    async fn stop(&self, timeout: Duration);
}

#[async_trait]
impl AgentProcessHandle for crate::AgentProcess {
    fn pid(&self) -> u32 {
        crate::AgentProcess::pid(self)
    }

    fn is_running(&self) -> bool {
        crate::AgentProcess::is_running(self)
    }

    async fn session_id(&self) -> Option<AgentSessionId> {
        crate::AgentProcess::session_id(self).await
    }

    async fn send_message(&self, text: &str) -> bool {
        crate::AgentProcess::send_message(self, text).await
    }

    async fn events(&self) -> Option<mpsc::UnboundedReceiver<AgentEvent>> {
        crate::AgentProcess::events(self).await
    }

    async fn stop(&self, timeout: Duration) {
        crate::AgentProcess::stop(self, timeout).await
    }
}
