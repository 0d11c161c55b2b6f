// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage capabilities consumed by the gate.

use imagegate_core::error::Result;

/// Byte storage for uploads, addressed by an opaque location string.
///
/// Implementations must be shareable across threads: the concurrent batch
/// mode reads several uploads at once.
pub trait UploadStore: Send + Sync {
    /// Read the full contents of the upload at `location`.
    fn read(&self, location: &str) -> Result<Vec<u8>>;

    /// Delete the upload at `location`.
    ///
    /// Idempotent: discarding something that is already gone is `Ok(())`.
    fn discard(&self, location: &str) -> Result<()>;

    /// Replace the upload at `location` with `bytes`. On failure the previous
    /// contents must still be intact.
    fn overwrite(&self, location: &str, bytes: &[u8]) -> Result<()>;
}
