// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The small key-value config blob: reserved operator thread id, the
//! frontend's poll cursor, a topic-id<->name mirror, and similar singletons.

use crate::error::StorageError;
use crate::store::AtomicJsonStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDoc {
    #[serde(flatten)]
    entries: IndexMap<String, Value>,
}

pub struct Config {
    store: AtomicJsonStore<ConfigDoc>,
}

impl Config {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self { store: AtomicJsonStore::open(path.as_ref()) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.read().entries.get(key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(String::from))
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), StorageError> {
        let value = value.into();
        self.store.update(|doc| {
            doc.entries.insert(key.to_string(), value.clone());
        })?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.store.update(|doc| {
            doc.entries.shift_remove(key);
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
