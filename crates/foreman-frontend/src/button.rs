// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// One button attached to a chat message. `callback_data` round-trips back
/// through an [`foreman_core::IncomingMessage`] when clicked — e.g.
/// `"allow:T1"` / `"deny:T1"` for a permission prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { label: label.into(), callback_data: callback_data.into() }
    }

    /// The two-button allow/deny prompt the daemon posts for a pending
    /// permission (the daemon's permission-notifications loop).
    pub fn allow_deny(tool_use_id: &str) -> Vec<Self> {
        vec![
            Self::new("Allow", format!("allow:{tool_use_id}")),
            Self::new("Deny", format!("deny:{tool_use_id}")),
        ]
    }
}
