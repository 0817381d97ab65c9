// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single JSON document, reload-on-stale-mtime, atomic write-to-temp-then-
//! rename. Shared by [`crate::registry::Registry`] and [`crate::config::Config`].

use crate::error::StorageError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

struct Cache<T> {
    value: T,
    mtime: Option<SystemTime>,
}

/// A file-backed store for one `T`, safe to share across tasks in a single
/// process. Writes are serialized by an internal lock; reads transparently
/// reload when the file's mtime advances, so external edits (or other
/// daemon instances, in the degenerate case) are observed.
pub struct AtomicJsonStore<T> {
    path: PathBuf,
    cache: Mutex<Cache<T>>,
}

impl<T> AtomicJsonStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Cache { value: T::default(), mtime: None };
        let store = Self { path, cache: Mutex::new(cache) };
        store.reload_if_stale(&mut store.cache.lock());
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current value, reloading first if the file's mtime has
    /// advanced since the last load. A single `stat` call per read.
    pub fn read(&self) -> T {
        let mut cache = self.cache.lock();
        self.reload_if_stale(&mut cache);
        cache.value.clone()
    }

    /// Replace the stored value and write it atomically: serialize to a
    /// sibling `.tmp` file, `fsync`-free rename over the real path. On
    /// rename failure the temp file is unlinked and the error is surfaced;
    /// on success the in-memory cache and mtime are updated so a
    /// same-process reader never sees a stale reload.
    pub fn write(&self, value: T) -> Result<(), StorageError> {
        let mut cache = self.cache.lock();
        self.persist(&value)?;
        cache.value = value;
        cache.mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        Ok(())
    }

    /// Read-modify-write under the store's lock, so concurrent callers in
    /// this process never interleave.
    pub fn update<F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut T),
    {
        let mut cache = self.cache.lock();
        self.reload_if_stale(&mut cache);
        let mut next = cache.value.clone();
        f(&mut next);
        self.persist(&next)?;
        cache.value = next.clone();
        cache.mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        Ok(next)
    }

    fn persist(&self, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)
            .map_err(|source| StorageError::Write { path: tmp.display().to_string(), source })?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StorageError::Rename {
                tmp: tmp.display().to_string(),
                path: self.path.display().to_string(),
                source,
            }
        })
    }

    fn reload_if_stale(&self, cache: &mut Cache<T>) {
        let stat = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            // Missing/unreadable: keep whatever is already cached.
            Err(_) => return,
        };
        let mtime = stat.modified().ok();
        if mtime.is_some() && mtime == cache.mtime {
            return;
        }
        match fs::read_to_string(&self.path).ok().and_then(|s| serde_json::from_str(&s).ok()) {
            Some(value) => cache.value = value,
            // Unreadable content or parse failure: treated as empty, never raised.
            None => cache.value = T::default(),
        }
        cache.mtime = mtime;
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
