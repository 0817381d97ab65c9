// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The abstract contract the orchestrator programs against. A concrete
//! adapter owns its own polling loop and outgoing serialization and
//! persists its poll cursor via the config store so restarts don't replay
//! or lose events — none of that is specified here, only the surface.

use crate::button::Button;
use crate::error::FrontendError;
use async_trait::async_trait;
use foreman_core::ids::{ChatMessageId, ChatThreadId, TaskName};
use foreman_core::IncomingMessage;

#[async_trait]
pub trait Frontend: Send + Sync {
    /// Allocate a new chat thread for `task_name`, e.g. a topic in a forum
    /// channel or a dedicated sub-thread. Callers (worker lifecycle)
    /// create the thread before writing the task's registry row, and roll
    /// back via [`Self::close_thread`] on any failure afterward.
    async fn create_thread(&self, task_name: &TaskName) -> Result<ChatThreadId, FrontendError>;

    /// Tear down a thread created by [`Self::create_thread`]. `archive`
    /// requests a soft close (rename/flag) instead of a hard delete, for
    /// callers that want the transcript kept around.
    async fn close_thread(&self, thread_id: &ChatThreadId, archive: bool) -> Result<(), FrontendError>;

    /// Post a new message in `task_id`'s chat thread, returning the
    /// message id the adapter assigned it.
    async fn send(
        &self,
        task_id: &TaskName,
        content: &str,
        buttons: Option<Vec<Button>>,
    ) -> Result<ChatMessageId, FrontendError>;

    /// Edit a previously sent message in place (e.g. to show "Allowed"
    /// once a permission decision lands).
    async fn update(
        &self,
        task_id: &TaskName,
        chat_message_id: &ChatMessageId,
        content: Option<&str>,
        buttons: Option<Vec<Button>>,
    ) -> Result<(), FrontendError>;

    async fn delete(
        &self,
        task_id: &TaskName,
        chat_message_id: &ChatMessageId,
    ) -> Result<(), FrontendError>;

    async fn show_typing(&self, task_id: &TaskName) -> Result<(), FrontendError>;

    /// Next inbound message or button callback, or `None` once the
    /// adapter's polling loop has been shut down.
    async fn next_incoming(&self) -> Option<IncomingMessage>;
}
