// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent binary's CLI invocation surface.

use foreman_core::AgentSessionId;

/// Baseline flags every invocation carries.
const BASELINE: &[&str] =
    &["--print", "--verbose", "--output-format", "stream-json", "--input-format", "stream-json"];

/// Build the argv for spawning (or resuming) an agent process.
#[derive(Debug, Clone, Default)]
pub struct ArgvBuilder {
    resume: Option<AgentSessionId>,
    allowed_tools: Vec<String>,
    extra_args: Vec<String>,
}

impl ArgvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(mut self, session_id: AgentSessionId) -> Self {
        self.resume = Some(session_id);
        self
    }

    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Vec<String> {
        let mut argv: Vec<String> = BASELINE.iter().map(|s| s.to_string()).collect();
        if let Some(session_id) = self.resume {
            argv.push("--resume".to_string());
            argv.push(session_id.as_str().to_string());
        }
        if !self.allowed_tools.is_empty() {
            argv.push("--allowedTools".to_string());
            argv.push(self.allowed_tools.join(","));
        }
        argv.extend(self.extra_args);
        argv
    }
}

#[cfg(test)]
#[path = "argv_tests.rs"]
mod tests;
