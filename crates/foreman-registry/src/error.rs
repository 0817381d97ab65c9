// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures from the registry/config atomic-write path. Read failures never
/// surface as errors — they degrade to an empty store; only a
/// failed rename — meaning the write may not have landed — is reported.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Write { path: String, #[source] source: std::io::Error },
    #[error("failed to rename {tmp} to {path}: {source}")]
    Rename { tmp: String, path: String, #[source] source: std::io::Error },
    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),
}
