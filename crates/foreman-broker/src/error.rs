// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to bind permission broker listener on {addr}: {source}")]
    Bind { addr: String, #[source] source: std::io::Error },
    #[error("permission broker HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}
