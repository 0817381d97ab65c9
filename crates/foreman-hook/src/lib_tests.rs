use super::*;
use foreman_broker::{http::router, PermissionBroker};
use foreman_core::ids::ToolUseId;
use foreman_core::permission::Decision;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_broker(broker: Arc<PermissionBroker>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(broker)).await;
    });
    format!("http://{addr}/permission/request")
}

fn stdin(tool_name: &str, tool_use_id: &str) -> String {
    serde_json::json!({
        "tool_name": tool_name,
        "tool_input": {"command": "ls"},
        "tool_use_id": tool_use_id,
        "session_id": "s1",
        "cwd": "/tmp",
    })
    .to_string()
}

#[tokio::test]
async fn auto_allowed_tool_round_trips_without_a_human() {
    let broker = PermissionBroker::new();
    let url = spawn_broker(broker).await;
    let client = reqwest::Client::new();

    let output = handle(&client, &url, &stdin("Read", "t1")).await;

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "allow");
    assert_eq!(output["hookSpecificOutput"]["permissionDecisionReason"], "auto");
}

#[tokio::test]
async fn a_human_allow_reaches_the_hook_output() {
    let broker = PermissionBroker::new();
    let url = spawn_broker(broker.clone()).await;
    let client = reqwest::Client::new();

    let call = tokio::spawn({
        let client = client.clone();
        let url = url.clone();
        async move { handle(&client, &url, &stdin("Bash", "t2")).await }
    });

    let (id, _session) = broker.next_notification().await.expect("a notification");
    assert_eq!(id, ToolUseId::from("t2"));
    assert!(broker.respond(&ToolUseId::from("t2"), Decision::Allow, "user decision"));

    let output = call.await.unwrap();
    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "allow");
    assert_eq!(output["hookSpecificOutput"]["permissionDecisionReason"], "user decision");
}

#[tokio::test]
async fn unreachable_broker_fails_open() {
    let client = reqwest::Client::builder().timeout(Duration::from_millis(500)).build().unwrap();
    // Port 0 never accepts connections; nothing is listening on it.
    let output = handle(&client, "http://127.0.0.1:1/permission/request", &stdin("Bash", "t3")).await;

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "allow");
}

#[tokio::test]
async fn malformed_stdin_fails_open() {
    let client = reqwest::Client::new();
    let output = handle(&client, "http://127.0.0.1:1/permission/request", "{not json").await;

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "allow");
    assert_eq!(output["hookSpecificOutput"]["permissionDecisionReason"], "Invalid hook input");
}

#[tokio::test]
async fn missing_required_field_fails_closed() {
    let broker = PermissionBroker::new();
    let url = spawn_broker(broker).await;
    let client = reqwest::Client::new();

    let incomplete = serde_json::json!({"tool_name": "Bash"}).to_string();
    let output = handle(&client, &url, &incomplete).await;

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "deny");
    assert_eq!(output["hookSpecificOutput"]["permissionDecisionReason"], "Missing required fields");
    // Never reaches the broker: no notification was ever emitted for it.
    assert!(broker.get(&ToolUseId::from("")).is_none());
}

#[tokio::test]
async fn a_broker_side_permission_timeout_passes_through_as_deny() {
    let broker = PermissionBroker::with_timeout(Duration::from_millis(50));
    let url = spawn_broker(broker).await;
    let client = reqwest::Client::new();

    let output = handle(&client, &url, &stdin("Bash", "t4")).await;

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "deny");
}

#[test]
fn unsupervised_mode_is_gated_by_exact_env_value() {
    // SAFETY-equivalent: env var mutation in a single-threaded test; no
    // assertion here depends on another test's environment.
    std::env::remove_var(SUPERVISED_ENV);
    assert!(!is_supervised());

    std::env::set_var(SUPERVISED_ENV, "yes");
    assert!(!is_supervised());

    std::env::set_var(SUPERVISED_ENV, "1");
    assert!(is_supervised());

    std::env::remove_var(SUPERVISED_ENV);
}

#[test]
fn passthrough_output_has_no_decision_fields() {
    let output = passthrough_output();
    assert_eq!(output, serde_json::json!({"hookSpecificOutput": {}}));
}

#[test]
fn broker_url_from_env_defaults_to_the_daemons_fixed_port() {
    std::env::remove_var("FOREMAN_BROKER_HOST");
    std::env::remove_var("FOREMAN_BROKER_PORT");
    assert_eq!(broker_url_from_env(), "http://127.0.0.1:8787/permission/request");
}
