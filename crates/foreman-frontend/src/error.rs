// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// A transport-level failure talking to the chat service. Never fatal to
/// the daemon — callers log and, for outbound sends, retry the affected
/// poll/send iteration after a backoff.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error("unknown chat thread for task")]
    UnknownThread,
}
