// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted, in-process stand-in for [`crate::AgentProcess`] — no
//! subprocess, no I/O. Lets the supervisor and daemon be exercised against
//! deterministic event sequences.

use crate::handle::AgentProcessHandle;
use async_trait::async_trait;
use foreman_core::ids::AgentSessionId;
use foreman_wire::AgentEvent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct FakeAgentProcess {
    pid: AtomicU32,
    session_id: Mutex<Option<AgentSessionId>>,
    running: AtomicBool,
    events_tx: Mutex<Option<mpsc::UnboundedSender<AgentEvent>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<AgentEvent>>>,
    sent_messages: Mutex<Vec<String>>,
}

impl FakeAgentProcess {
    pub fn new(session_id: AgentSessionId, pid: u32) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            pid: AtomicU32::new(pid),
            session_id: Mutex::new(Some(session_id)),
            running: AtomicBool::new(true),
            events_tx: Mutex::new(Some(tx)),
            events_rx: Mutex::new(Some(rx)),
            sent_messages: Mutex::new(Vec::new()),
        })
    }

    /// Queue an event as if it had just arrived on the child's stdout.
    pub fn push_event(&self, event: AgentEvent) {
        if let Some(tx) = self.events_tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent_messages.lock().clone()
    }

    /// Simulate a crash: the process disappears without a graceful stop.
    pub fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.events_tx.lock().take();
    }
}

#[async_trait]
impl AgentProcessHandle for FakeAgentProcess {
    fn pid(&self) -> u32 {
        self.pid.load(Ordering::SeqCst)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn session_id(&self) -> Option<AgentSessionId> {
        self.session_id.lock().clone()
    }

    async fn send_message(&self, text: &str) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sent_messages.lock().push(text.to_string());
        true
    }

    async fn events(&self) -> Option<mpsc::UnboundedReceiver<AgentEvent>> {
        self.events_rx.lock().take()
    }

    async fn stop(&self, _timeout: Duration) {
        self.running.store(false, Ordering::SeqCst);
        self.events_tx.lock().take();
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
