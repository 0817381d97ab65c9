// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `foreman-hook`: the pre-tool-use hook the installer wires into the
//! agent binary's hook configuration. Reads one JSON object from stdin,
//! writes one back to stdout, always exits 0 — the decision lives in the
//! payload, not the exit code.

use std::io::Read;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut raw_stdin = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw_stdin) {
        tracing::warn!(%err, "failed to read hook stdin");
    }

    if !foreman_hook::is_supervised() {
        print_json(&foreman_hook::passthrough_output());
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(%err, "failed to start async runtime; failing open");
            print_json(&serde_json::json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "allow",
                    "permissionDecisionReason": "hook runtime unavailable",
                }
            }));
            return ExitCode::SUCCESS;
        }
    };

    let output = runtime.block_on(async {
        let client = match reqwest::Client::builder().timeout(foreman_hook::HOOK_TIMEOUT).build() {
            Ok(client) => client,
            Err(_) => reqwest::Client::new(),
        };
        let broker_url = foreman_hook::broker_url_from_env();
        foreman_hook::handle(&client, &broker_url, &raw_stdin).await
    });

    print_json(&output);
    ExitCode::SUCCESS
}

fn print_json(value: &serde_json::Value) {
    println!("{value}");
}
