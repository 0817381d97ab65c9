// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_init_system_event() {
    let line = r#"{"type":"system","subtype":"init","session_id":"S1","tools":["Read","Bash"],"model":"claude"}"#;
    let event = parse_event_line(line).unwrap();
    match event {
        AgentEvent::System(sys) => {
            assert!(sys.is_init());
            assert_eq!(sys.session_id, foreman_core::AgentSessionId::from("S1"));
            assert_eq!(sys.tools, vec!["Read".to_string(), "Bash".to_string()]);
        }
        other => panic!("expected system event, got {other:?}"),
    }
}

#[test]
fn parses_assistant_text_and_tool_use() {
    let line = r#"{"type":"assistant","message":{"id":"m1","model":"claude","content":[
        {"type":"text","text":"hi"},
        {"type":"tool_use","id":"T1","name":"Bash","input":{"command":"ls"}}
    ]}}"#;
    let event = parse_event_line(line).unwrap();
    match event {
        AgentEvent::Assistant(asst) => {
            assert_eq!(asst.message.text(), "hi");
            let tool_uses: Vec<_> = asst.message.tool_uses().collect();
            assert_eq!(tool_uses.len(), 1);
            assert_eq!(tool_uses[0].name, "Bash");
        }
        other => panic!("expected assistant event, got {other:?}"),
    }
}

#[test]
fn parses_result_event() {
    let line = r#"{"type":"result","subtype":"success","result":"done","total_cost_usd":0.001,"num_turns":1,"session_id":"S1"}"#;
    let event = parse_event_line(line).unwrap();
    match event {
        AgentEvent::Result(res) => {
            assert!(res.is_success());
            assert_eq!(res.total_cost_usd, Some(0.001));
        }
        other => panic!("expected result event, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_an_error_not_a_panic() {
    assert!(parse_event_line("not json").is_err());
}

#[test]
fn thinking_blocks_are_not_forwarded_by_text() {
    let line = r#"{"type":"assistant","message":{"id":"m1","content":[
        {"type":"thinking","thinking":"pondering"},
        {"type":"text","text":"answer"}
    ]}}"#;
    let event = parse_event_line(line).unwrap();
    match event {
        AgentEvent::Assistant(asst) => assert_eq!(asst.message.text(), "answer"),
        other => panic!("expected assistant event, got {other:?}"),
    }
}
