// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`Frontend`] that records every outbound call and lets
//! tests inject incoming messages — the core's one concrete adapter,
//! satisfying the trait without depending on any specific chat service.

use crate::button::Button;
use crate::error::FrontendError;
use crate::frontend::Frontend;
use async_trait::async_trait;
use foreman_core::ids::{ChatMessageId, ChatThreadId, TaskName};
use foreman_core::IncomingMessage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub task_id: TaskName,
    pub content: String,
    pub buttons: Option<Vec<Button>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedMessage {
    pub task_id: TaskName,
    pub chat_message_id: ChatMessageId,
    pub content: Option<String>,
    pub buttons: Option<Vec<Button>>,
}

pub struct FakeFrontend {
    next_id: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    updated: Mutex<Vec<UpdatedMessage>>,
    deleted: Mutex<Vec<(TaskName, ChatMessageId)>>,
    threads: Mutex<Vec<ChatThreadId>>,
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<IncomingMessage>>,
}

impl FakeFrontend {
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            next_id: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: tokio::sync::Mutex::new(incoming_rx),
        }
    }

    pub fn push_incoming(&self, message: IncomingMessage) {
        let _ = self.incoming_tx.send(message);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn updated(&self) -> Vec<UpdatedMessage> {
        self.updated.lock().clone()
    }

    pub fn deleted(&self) -> Vec<(TaskName, ChatMessageId)> {
        self.deleted.lock().clone()
    }

    pub fn threads(&self) -> Vec<ChatThreadId> {
        self.threads.lock().clone()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for FakeFrontend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Frontend for FakeFrontend {
    async fn create_thread(&self, task_name: &TaskName) -> Result<ChatThreadId, FrontendError> {
        let thread_id = ChatThreadId::from(format!("thread-{}-{}", task_name, self.allocate_id()));
        self.threads.lock().push(thread_id.clone());
        Ok(thread_id)
    }

    async fn close_thread(&self, thread_id: &ChatThreadId, _archive: bool) -> Result<(), FrontendError> {
        self.threads.lock().retain(|id| id != thread_id);
        Ok(())
    }

    async fn send(
        &self,
        task_id: &TaskName,
        content: &str,
        buttons: Option<Vec<Button>>,
    ) -> Result<ChatMessageId, FrontendError> {
        self.sent.lock().push(SentMessage {
            task_id: task_id.clone(),
            content: content.to_string(),
            buttons,
        });
        Ok(ChatMessageId::from(format!("msg-{}", self.allocate_id())))
    }

    async fn update(
        &self,
        task_id: &TaskName,
        chat_message_id: &ChatMessageId,
        content: Option<&str>,
        buttons: Option<Vec<Button>>,
    ) -> Result<(), FrontendError> {
        self.updated.lock().push(UpdatedMessage {
            task_id: task_id.clone(),
            chat_message_id: chat_message_id.clone(),
            content: content.map(String::from),
            buttons,
        });
        Ok(())
    }

    async fn delete(&self, task_id: &TaskName, chat_message_id: &ChatMessageId) -> Result<(), FrontendError> {
        self.deleted.lock().push((task_id.clone(), chat_message_id.clone()));
        Ok(())
    }

    async fn show_typing(&self, _task_id: &TaskName) -> Result<(), FrontendError> {
        Ok(())
    }

    async fn next_incoming(&self) -> Option<IncomingMessage> {
        self.incoming_rx.lock().await.recv().await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
