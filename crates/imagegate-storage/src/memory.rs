// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory upload store. Records every operation so callers can assert what
// the gate touched, and can be told to fail overwrites.

use std::collections::HashMap;
use std::sync::Mutex;

use imagegate_core::error::{GateError, Result};

use crate::traits::UploadStore;

/// One call made against a `MemoryStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Read(String),
    Discard(String),
    Overwrite(String),
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, Vec<u8>>,
    ops: Vec<StoreOp>,
    fail_overwrites: bool,
}

/// Thread-safe map of location to bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an upload.
    pub fn insert(&self, location: impl Into<String>, bytes: Vec<u8>) {
        self.lock().files.insert(location.into(), bytes);
    }

    /// Current contents of `location`, without recording an operation.
    pub fn get(&self, location: &str) -> Option<Vec<u8>> {
        self.lock().files.get(location).cloned()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.lock().files.contains_key(location)
    }

    /// Every operation performed so far, in call order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    /// Make every subsequent `overwrite` fail.
    pub fn fail_overwrites(&self, fail: bool) {
        self.lock().fail_overwrites = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated,
        // so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn missing(location: &str) -> GateError {
    GateError::Storage {
        location: location.to_owned(),
        detail: "no such upload".into(),
    }
}

impl UploadStore for MemoryStore {
    fn read(&self, location: &str) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        inner.ops.push(StoreOp::Read(location.to_owned()));
        inner.files.get(location).cloned().ok_or_else(|| missing(location))
    }

    fn discard(&self, location: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.ops.push(StoreOp::Discard(location.to_owned()));
        inner.files.remove(location);
        Ok(())
    }

    fn overwrite(&self, location: &str, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        inner.ops.push(StoreOp::Overwrite(location.to_owned()));
        if inner.fail_overwrites {
            return Err(GateError::Storage {
                location: location.to_owned(),
                detail: "overwrite refused".into(),
            });
        }
        if !inner.files.contains_key(location) {
            return Err(missing(location));
        }
        inner.files.insert(location.to_owned(), bytes.to_vec());
        Ok(())
    }
}
