use super::*;
use crate::broker::PermissionBroker;
use foreman_core::ids::ToolUseId;
use foreman_core::permission::Decision;

async fn spawn_server(broker: Arc<PermissionBroker>) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(broker)).await;
    });
    addr
}

#[tokio::test]
async fn auto_allow_round_trips_over_http() {
    let broker = PermissionBroker::new();
    let addr = spawn_server(broker).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/permission/request"))
        .json(&serde_json::json!({
            "tool_name": "Read",
            "tool_input": {"file_path": "/tmp/x"},
            "tool_use_id": "t1",
            "session_id": "s1",
            "cwd": "/tmp",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["decision"], "allow");
    assert_eq!(body["reason"], "auto");
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let broker = PermissionBroker::new();
    let addr = spawn_server(broker).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/permission/request"))
        .json(&serde_json::json!({"tool_name": "Bash"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn a_pending_request_unblocks_on_respond() {
    let broker = PermissionBroker::new();
    let addr = spawn_server(broker.clone()).await;

    let client = reqwest::Client::new();
    let call = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .post(format!("http://{addr}/permission/request"))
                .json(&serde_json::json!({
                    "tool_name": "Bash",
                    "tool_input": {"command": "ls"},
                    "tool_use_id": "t1",
                    "session_id": "s1",
                    "cwd": "/tmp",
                }))
                .send()
                .await
                .unwrap()
        }
    });

    let (id, _session) = broker.next_notification().await.expect("a notification");
    assert_eq!(id, ToolUseId::from("t1"));
    assert!(broker.respond(&ToolUseId::from("t1"), Decision::Deny, "user decision"));

    let response = call.await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["decision"], "deny");
    assert_eq!(body["reason"], "user decision");
}
