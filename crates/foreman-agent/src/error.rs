// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentProcessError {
    #[error("failed to spawn agent process: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("agent process did not emit an init event within {0:?}")]
    StartupTimeout(std::time::Duration),
    #[error("agent stdout closed before an init event arrived")]
    StdoutClosedBeforeInit,
    #[error("expected resumed session id {expected} but agent reported {actual}")]
    SessionIdMismatch { expected: String, actual: String },
}
