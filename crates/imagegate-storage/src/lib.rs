// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imagegate-storage — Where uploaded bytes live while they are judged.
//
// The gate only ever reads an upload, discards a rejected one, or overwrites
// an admitted one with its resized encoding. `UploadStore` captures exactly
// those three capabilities; `LocalFileStore` backs them with the filesystem
// and `MemoryStore` keeps everything in a map for tests and embedding.

pub mod integrity;
pub mod local;
pub mod memory;
pub mod traits;

pub use integrity::fingerprint;
pub use local::LocalFileStore;
pub use memory::{MemoryStore, StoreOp};
pub use traits::UploadStore;
