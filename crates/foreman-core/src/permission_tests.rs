// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn auto_allow_set_covers_read_only_tools() {
    assert!(is_auto_allowed("Read"));
    assert!(is_auto_allowed("Grep"));
    assert!(!is_auto_allowed("Bash"));
    assert!(!is_auto_allowed("Write"));
}

#[test]
fn decision_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Decision::Allow).unwrap(), "\"allow\"");
    assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"deny\"");
}

#[test]
fn permission_decision_helpers_set_decision() {
    let allow = PermissionDecision::allow("auto");
    assert_eq!(allow.decision, Decision::Allow);
    assert_eq!(allow.reason, "auto");

    let deny = PermissionDecision::deny("timed out");
    assert_eq!(deny.decision, Decision::Deny);
}
