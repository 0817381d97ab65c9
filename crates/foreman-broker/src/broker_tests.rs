use super::*;
use foreman_core::ids::{AgentSessionId, ChatMessageId, ToolUseId};
use std::time::Duration;

#[tokio::test]
async fn auto_allowed_tools_never_wait_for_a_human() {
    let broker = PermissionBroker::new();
    let decision = broker
        .request(
            "Read".to_string(),
            serde_json::json!({"file_path": "/tmp/x"}),
            ToolUseId::from("t1"),
            AgentSessionId::from("s1"),
            "/tmp".to_string(),
        )
        .await;
    assert_eq!(decision.decision, Decision::Allow);
    assert_eq!(decision.reason, "auto");
}

#[tokio::test]
async fn allow_resolves_the_blocked_request() {
    let broker = PermissionBroker::new();
    let tool_use_id = ToolUseId::from("t1");

    let request = tokio::spawn({
        let broker = broker.clone();
        let tool_use_id = tool_use_id.clone();
        async move {
            broker
                .request(
                    "Bash".to_string(),
                    serde_json::json!({"command": "ls"}),
                    tool_use_id,
                    AgentSessionId::from("s1"),
                    "/tmp".to_string(),
                )
                .await
        }
    });

    let (id, session) = broker.next_notification().await.expect("a notification");
    assert_eq!(id, tool_use_id);
    assert_eq!(session, AgentSessionId::from("s1"));

    assert!(broker.respond(&tool_use_id, Decision::Allow, "user decision"));
    let decision = request.await.unwrap();
    assert_eq!(decision.decision, Decision::Allow);
    assert_eq!(decision.reason, "user decision");
}

#[tokio::test]
async fn a_second_respond_on_the_same_id_is_a_no_op() {
    let broker = PermissionBroker::new();
    let tool_use_id = ToolUseId::from("t1");

    let request = tokio::spawn({
        let broker = broker.clone();
        let tool_use_id = tool_use_id.clone();
        async move {
            broker
                .request(
                    "Bash".to_string(),
                    serde_json::Value::Null,
                    tool_use_id,
                    AgentSessionId::from("s1"),
                    "/tmp".to_string(),
                )
                .await
        }
    });
    broker.next_notification().await.expect("a notification");

    assert!(broker.respond(&tool_use_id, Decision::Allow, "first"));
    assert!(!broker.respond(&tool_use_id, Decision::Deny, "second"));

    let decision = request.await.unwrap();
    assert_eq!(decision.reason, "first");
}

#[tokio::test]
async fn timeout_denies_and_clears_the_pending_entry() {
    let broker = PermissionBroker::with_timeout(Duration::from_millis(20));
    let tool_use_id = ToolUseId::from("t1");

    let decision = broker
        .request(
            "Bash".to_string(),
            serde_json::Value::Null,
            tool_use_id.clone(),
            AgentSessionId::from("s1"),
            "/tmp".to_string(),
        )
        .await;

    assert_eq!(decision.decision, Decision::Deny);
    assert!(decision.reason.to_lowercase().contains("timed out"));
    assert!(broker.get(&tool_use_id).is_none());
    assert!(!broker.respond(&tool_use_id, Decision::Allow, "too late"));
}

#[tokio::test]
async fn respond_by_message_id_uses_the_reverse_mapping() {
    let broker = PermissionBroker::new();
    let tool_use_id = ToolUseId::from("t1");
    let message_id = ChatMessageId::from("m1");

    let request = tokio::spawn({
        let broker = broker.clone();
        let tool_use_id = tool_use_id.clone();
        async move {
            broker
                .request(
                    "Bash".to_string(),
                    serde_json::Value::Null,
                    tool_use_id,
                    AgentSessionId::from("s1"),
                    "/tmp".to_string(),
                )
                .await
        }
    });
    broker.next_notification().await.expect("a notification");

    broker.register_chat_message(&tool_use_id, message_id.clone());
    assert!(broker.respond_by_message_id(&message_id, Decision::Deny, "user decision"));

    let decision = request.await.unwrap();
    assert_eq!(decision.decision, Decision::Deny);
}

#[tokio::test]
async fn register_chat_message_is_visible_via_get() {
    let broker = PermissionBroker::new();
    let tool_use_id = ToolUseId::from("t1");

    let _request = tokio::spawn({
        let broker = broker.clone();
        let tool_use_id = tool_use_id.clone();
        async move {
            broker
                .request(
                    "Bash".to_string(),
                    serde_json::Value::Null,
                    tool_use_id,
                    AgentSessionId::from("s1"),
                    "/tmp".to_string(),
                )
                .await
        }
    });
    broker.next_notification().await.expect("a notification");

    assert!(broker.get(&tool_use_id).unwrap().chat_message_id.is_none());
    broker.register_chat_message(&tool_use_id, ChatMessageId::from("m1"));
    assert_eq!(broker.get(&tool_use_id).unwrap().chat_message_id, Some(ChatMessageId::from("m1")));

    broker.respond(&tool_use_id, Decision::Allow, "done");
}

#[tokio::test]
async fn next_notification_stops_after_shutdown() {
    let broker = PermissionBroker::new();
    broker.shutdown();
    assert!(broker.next_notification().await.is_none());
}
