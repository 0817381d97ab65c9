// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent-side half of the Permission Broker's rendezvous: a
//! pre-tool-use hook that reads one JSON object from stdin, POSTs it to
//! the broker's HTTP endpoint, and writes the decision back as the
//! `hookSpecificOutput` stdout contract the agent binary expects.
//!
//! Precedence, checked in order: (1) an unmanaged session passes through
//! untouched, before stdin is even read; (2) malformed JSON fails open —
//! a parse bug in the hook itself should not brick the agent; (3) missing
//! required fields fails closed without ever contacting the broker; (4) an
//! unreachable broker fails open; (5) a broker-side timeout fails closed;
//! (6) any other transport or decoding failure fails open. Every path
//! writes exactly one JSON document to stdout and the process always
//! exits 0 — the outcome lives in the payload, never the exit code.

use foreman_core::ids::{AgentSessionId, ToolUseId};
use foreman_core::permission::{PermissionDecision, PermissionRequest};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable gating hook activation. Unset (or not exactly
/// `"1"`) means an un-supervised agent: emit an empty
/// `hookSpecificOutput` and let the agent behave as it would standalone.
pub const SUPERVISED_ENV: &str = "SUPERVISED";

/// The broker waits up to 300s for a human; the hook's own HTTP timeout
/// must comfortably exceed that so a live, merely-slow broker can't be
/// mistaken for an unreachable one.
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(310);

/// Whether the hook should contact the broker at all. `SUPERVISED` must be
/// exactly `"1"`; any other value (including unset) means standalone.
pub fn is_supervised() -> bool {
    std::env::var(SUPERVISED_ENV).as_deref() == Ok("1")
}

/// The un-supervised stdout payload: a `hookSpecificOutput` with no
/// decision fields, letting the agent's own default behavior apply.
pub fn passthrough_output() -> Value {
    json!({ "hookSpecificOutput": {} })
}

/// Read the stdin document, round-trip it through the broker at
/// `broker_url`, and return the stdout payload. Never returns an `Err`:
/// every failure mode resolves to a decision per the module doc's
/// precedence, because the hook's own exit code is always 0.
pub async fn handle(client: &reqwest::Client, broker_url: &str, raw_stdin: &str) -> Value {
    let decision = decide(client, broker_url, raw_stdin).await;
    wrap(decision)
}

async fn decide(client: &reqwest::Client, broker_url: &str, raw_stdin: &str) -> PermissionDecision {
    let body: Value = match serde_json::from_str(raw_stdin) {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "invalid hook input; failing open");
            return PermissionDecision::allow("Invalid hook input");
        }
    };
    let request = match parse_request(&body) {
        Some(request) => request,
        None => {
            warn!("pre-tool-use hook input missing a required field; failing closed");
            return PermissionDecision::deny("Missing required fields");
        }
    };

    match client.post(broker_url).json(&request).send().await {
        Ok(response) => parse_response(response).await,
        Err(err) if err.is_timeout() => {
            warn!(%err, "permission request timed out; failing closed");
            PermissionDecision::deny("Permission request timed out")
        }
        Err(err) => {
            warn!(%err, "permission broker unreachable; failing open");
            PermissionDecision::allow(err.to_string())
        }
    }
}

/// `tool_name`/`tool_use_id`/`session_id` must be present and truthy
/// (non-empty strings); `tool_input`/`cwd` default to empty.
fn parse_request(body: &Value) -> Option<PermissionRequest> {
    let tool_name = non_empty_str(body, "tool_name")?;
    let tool_use_id = non_empty_str(body, "tool_use_id")?;
    let session_id = non_empty_str(body, "session_id")?;
    let cwd = body.get("cwd").and_then(Value::as_str).unwrap_or("").to_string();
    let tool_input = body.get("tool_input").cloned().unwrap_or(Value::Object(Default::default()));
    Some(PermissionRequest {
        tool_name,
        tool_input,
        tool_use_id: ToolUseId::from(tool_use_id),
        session_id: AgentSessionId::from(session_id),
        cwd,
    })
}

fn non_empty_str(body: &Value, field: &str) -> Option<String> {
    let value = body.get(field)?.as_str()?;
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

async fn parse_response(response: reqwest::Response) -> PermissionDecision {
    if !response.status().is_success() {
        let status = response.status();
        warn!(%status, "permission broker returned an error status; failing open");
        return PermissionDecision::allow(format!("permission broker returned {status}"));
    }
    match response.json::<PermissionDecision>().await {
        Ok(decision) => {
            debug!(decision = decision.decision.as_str(), "permission decision received");
            decision
        }
        Err(err) => {
            warn!(%err, "malformed permission broker response; failing open");
            PermissionDecision::allow(err.to_string())
        }
    }
}

fn wrap(decision: PermissionDecision) -> Value {
    json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": decision.decision.as_str(),
            "permissionDecisionReason": decision.reason,
        }
    })
}

/// Build the broker URL from the same environment variables
/// `foremand` reads for its own listen address, so the installer only
/// has to export one pair of values to both sides.
pub fn broker_url_from_env() -> String {
    let host = std::env::var("FOREMAN_BROKER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("FOREMAN_BROKER_PORT").unwrap_or_else(|_| "8787".to_string());
    format!("http://{host}:{port}/permission/request")
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
