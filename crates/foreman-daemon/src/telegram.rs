// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A concrete [`Frontend`] adapter over the Telegram Bot API, using forum
//! topics as chat threads (`message_thread_id` <-> [`ChatThreadId`]).
//!
//! This is the one piece of the daemon that is an external collaborator by
//! nature: the concrete chat-service transport, its polling and
//! message-formatting details, are not load-bearing for the supervisor
//! core. This adapter exists so `foremand` is a runnable binary rather than
//! a library missing its last piece; it is deliberately thin and leaves
//! markdown escaping/formatting to the caller.

use async_trait::async_trait;
use foreman_core::ids::{ChatMessageId, ChatThreadId, TaskName};
use foreman_core::IncomingMessage;
use foreman_frontend::{Button, Frontend, FrontendError};
use foreman_registry::{Config, Registry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// The operator's designated "general" thread: the forum's root,
/// which Telegram addresses by omitting `message_thread_id` rather than by
/// a real topic id.
const GENERAL_THREAD: &str = "general";

const POLL_OFFSET_KEY: &str = "telegram_poll_offset";
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramFrontend {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    config: Arc<Config>,
    registry: Arc<Registry>,
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    incoming_rx: Mutex<mpsc::UnboundedReceiver<IncomingMessage>>,
    shutdown: Arc<AtomicBool>,
}

impl TelegramFrontend {
    pub fn new(bot_token: String, chat_id: String, config: Arc<Config>, registry: Arc<Registry>) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            client: reqwest::Client::new(),
            bot_token,
            chat_id,
            config,
            registry,
            incoming_tx,
            incoming_rx: Mutex::new(incoming_rx),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawn the background long-poll loop. Call once, before the daemon's
    /// incoming-messages loop starts consuming [`Frontend::next_incoming`].
    pub fn spawn_poll_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.poll_loop().await })
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, FrontendError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|err| FrontendError::Transport(err.to_string()))?;
        let parsed: Value = response.json().await.map_err(|err| FrontendError::Transport(err.to_string()))?;
        if parsed.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(FrontendError::Transport(format!("telegram API {method} failed: {parsed}")));
        }
        Ok(parsed["result"].clone())
    }

    fn thread_id_for(&self, task_id: &TaskName) -> Option<ChatThreadId> {
        if task_id.is_operator() {
            return Some(ChatThreadId::from(GENERAL_THREAD));
        }
        self.registry.get_task(task_id.as_str()).map(|task| task.chat_thread_id)
    }

    fn message_thread_id(thread_id: &ChatThreadId) -> Option<i64> {
        if thread_id.as_str() == GENERAL_THREAD {
            return None;
        }
        thread_id.as_str().parse().ok()
    }

    fn keyboard(buttons: &[Button]) -> Value {
        let row: Vec<Value> = buttons
            .iter()
            .map(|b| json!({"text": b.label, "callback_data": b.callback_data}))
            .collect();
        json!({"inline_keyboard": [row]})
    }

    async fn poll_loop(&self) {
        let mut offset: i64 =
            self.config.get(POLL_OFFSET_KEY).and_then(|v| v.as_i64()).unwrap_or(0);
        while !self.shutdown.load(Ordering::SeqCst) {
            let body = json!({
                "offset": offset,
                "timeout": LONG_POLL_TIMEOUT_SECS,
                "allowed_updates": ["message", "callback_query"],
            });
            let updates = match self.call("getUpdates", body).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(%err, "telegram poll failed; backing off");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            };
            let Some(updates) = updates.as_array() else { continue };
            for update in updates {
                if let Some(update_id) = update.get("update_id").and_then(Value::as_i64) {
                    offset = offset.max(update_id + 1);
                }
                if let Some(message) = self.parse_update(update) {
                    let _ = self.incoming_tx.send(message);
                }
            }
            if let Err(err) = self.config.set(POLL_OFFSET_KEY, offset) {
                warn!(%err, "failed to persist telegram poll cursor");
            }
        }
    }

    fn parse_update(&self, update: &Value) -> Option<IncomingMessage> {
        if let Some(callback) = update.get("callback_query") {
            let callback_data = callback.get("data").and_then(Value::as_str)?.to_string();
            let message = callback.get("message")?;
            let task_id = self.resolve_task_id(message)?;
            let chat_message_id =
                ChatMessageId::from(message.get("message_id")?.as_i64()?.to_string());
            return Some(IncomingMessage {
                task_id,
                text: None,
                callback_data: Some(callback_data),
                chat_message_id,
                reply_to_message_id: None,
                reply_to_payload: None,
            });
        }

        let message = update.get("message")?;
        let task_id = self.resolve_task_id(message)?;
        let text = message.get("text").and_then(Value::as_str).map(String::from);
        let chat_message_id = ChatMessageId::from(message.get("message_id")?.as_i64()?.to_string());
        let (reply_to_message_id, reply_to_payload) = match message.get("reply_to_message") {
            Some(replied) => (
                replied.get("message_id").and_then(Value::as_i64).map(|id| ChatMessageId::from(id.to_string())),
                Some(replied.clone()),
            ),
            None => (None, None),
        };
        Some(IncomingMessage {
            task_id,
            text,
            callback_data: None,
            chat_message_id,
            reply_to_message_id,
            reply_to_payload,
        })
    }

    /// `"operator"` for the general thread or a DM; otherwise the task whose
    /// registry row carries this update's topic id. `None` if neither
    /// resolves — an update for a thread with no known owner is dropped.
    fn resolve_task_id(&self, message: &Value) -> Option<TaskName> {
        match message.get("message_thread_id").and_then(Value::as_i64) {
            None => Some(TaskName::operator()),
            Some(thread_id) => {
                let chat_thread_id = ChatThreadId::from(thread_id.to_string());
                self.registry.find_task_by_chat_thread(&chat_thread_id).map(|(name, _)| name)
            }
        }
    }
}

#[async_trait]
impl Frontend for TelegramFrontend {
    async fn create_thread(&self, task_name: &TaskName) -> Result<ChatThreadId, FrontendError> {
        if task_name.is_operator() {
            return Ok(ChatThreadId::from(GENERAL_THREAD));
        }
        let result = self
            .call("createForumTopic", json!({"chat_id": self.chat_id, "name": task_name.as_str()}))
            .await?;
        let topic_id =
            result.get("message_thread_id").and_then(Value::as_i64).ok_or_else(|| {
                FrontendError::Transport("createForumTopic response missing message_thread_id".into())
            })?;
        Ok(ChatThreadId::from(topic_id.to_string()))
    }

    async fn close_thread(&self, thread_id: &ChatThreadId, archive: bool) -> Result<(), FrontendError> {
        if thread_id.as_str() == GENERAL_THREAD {
            return Ok(());
        }
        let Some(topic_id) = Self::message_thread_id(thread_id) else { return Ok(()) };
        let method = if archive { "closeForumTopic" } else { "deleteForumTopic" };
        self.call(method, json!({"chat_id": self.chat_id, "message_thread_id": topic_id})).await?;
        Ok(())
    }

    async fn send(
        &self,
        task_id: &TaskName,
        content: &str,
        buttons: Option<Vec<Button>>,
    ) -> Result<ChatMessageId, FrontendError> {
        let thread_id = self.thread_id_for(task_id).ok_or(FrontendError::UnknownThread)?;
        let mut body = json!({"chat_id": self.chat_id, "text": content, "parse_mode": "MarkdownV2"});
        if let Some(thread_id) = Self::message_thread_id(&thread_id) {
            body["message_thread_id"] = json!(thread_id);
        }
        if let Some(buttons) = &buttons {
            body["reply_markup"] = Self::keyboard(buttons);
        }
        let result = self.call("sendMessage", body).await?;
        let message_id = result.get("message_id").and_then(Value::as_i64).ok_or_else(|| {
            FrontendError::Transport("sendMessage response missing message_id".into())
        })?;
        Ok(ChatMessageId::from(message_id.to_string()))
    }

    async fn update(
        &self,
        task_id: &TaskName,
        chat_message_id: &ChatMessageId,
        content: Option<&str>,
        buttons: Option<Vec<Button>>,
    ) -> Result<(), FrontendError> {
        let message_id: i64 = chat_message_id
            .as_str()
            .parse()
            .map_err(|_| FrontendError::Transport("malformed telegram message id".into()))?;
        if let Some(content) = content {
            self.call(
                "editMessageText",
                json!({
                    "chat_id": self.chat_id,
                    "message_id": message_id,
                    "text": content,
                    "parse_mode": "MarkdownV2",
                }),
            )
            .await?;
        }
        let reply_markup = match &buttons {
            Some(buttons) if !buttons.is_empty() => Self::keyboard(buttons),
            _ => json!({"inline_keyboard": []}),
        };
        let _ = task_id;
        self.call(
            "editMessageReplyMarkup",
            json!({"chat_id": self.chat_id, "message_id": message_id, "reply_markup": reply_markup}),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, _task_id: &TaskName, chat_message_id: &ChatMessageId) -> Result<(), FrontendError> {
        let message_id: i64 = chat_message_id
            .as_str()
            .parse()
            .map_err(|_| FrontendError::Transport("malformed telegram message id".into()))?;
        self.call("deleteMessage", json!({"chat_id": self.chat_id, "message_id": message_id})).await?;
        Ok(())
    }

    async fn show_typing(&self, task_id: &TaskName) -> Result<(), FrontendError> {
        let thread_id = self.thread_id_for(task_id).ok_or(FrontendError::UnknownThread)?;
        let mut body = json!({"chat_id": self.chat_id, "action": "typing"});
        if let Some(thread_id) = Self::message_thread_id(&thread_id) {
            body["message_thread_id"] = json!(thread_id);
        }
        self.call("sendChatAction", body).await?;
        Ok(())
    }

    async fn next_incoming(&self) -> Option<IncomingMessage> {
        self.incoming_rx.lock().await.recv().await
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
