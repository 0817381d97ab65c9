// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encodes one user turn as the single JSONL line the agent expects on
//! stdin: `{"type":"user","message":{"role":"user","content":[...]}}`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct StdinCommand<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: StdinMessage<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct StdinMessage<'a> {
    role: &'static str,
    content: Vec<StdinContent<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct StdinContent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Encode `text` as one JSONL line, no trailing newline — callers append
/// the newline themselves when writing to the child's stdin.
pub fn encode_user_text(text: &str) -> Result<String, serde_json::Error> {
    let command = StdinCommand {
        kind: "user",
        message: StdinMessage {
            role: "user",
            content: vec![StdinContent { kind: "text", text }],
        },
    };
    serde_json::to_string(&command)
}

#[cfg(test)]
#[path = "stdin_command_tests.rs"]
mod tests;
