// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem-backed upload store.
//
// Locations are file paths, optionally relative to a root directory. An
// overwrite writes a sibling `<name>-resized` file and renames it over the
// original, so a failed write leaves the upload untouched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use imagegate_core::error::{GateError, Result};
use tracing::{debug, instrument, warn};

/// Suffix of the temporary file written during `overwrite`.
const RESIZED_SUFFIX: &str = "-resized";

/// Upload store over plain files.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore {
    root: Option<PathBuf>,
}

impl LocalFileStore {
    /// Store that treats every location as a path as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that resolves relative locations against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        }
    }
}

fn storage_err(path: &Path, err: std::io::Error) -> GateError {
    GateError::Storage {
        location: path.display().to_string(),
        detail: err.to_string(),
    }
}

fn sibling_temp(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(RESIZED_SUFFIX);
    path.with_file_name(name)
}

impl crate::traits::UploadStore for LocalFileStore {
    #[instrument(skip(self))]
    fn read(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location);
        std::fs::read(&path).map_err(|e| storage_err(&path, e))
    }

    #[instrument(skip(self))]
    fn discard(&self, location: &str) -> Result<()> {
        let path = self.resolve(location);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "upload discarded");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "upload already gone");
                Ok(())
            }
            Err(e) => Err(storage_err(&path, e)),
        }
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    fn overwrite(&self, location: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(location);
        let temp = sibling_temp(&path);

        if let Err(e) = std::fs::write(&temp, bytes) {
            // A partial temp file may or may not exist; the original is untouched.
            std::fs::remove_file(&temp).ok();
            return Err(storage_err(&temp, e));
        }

        if let Err(e) = std::fs::rename(&temp, &path) {
            if let Err(cleanup) = std::fs::remove_file(&temp) {
                warn!(path = %temp.display(), error = %cleanup, "failed to remove temporary file");
            }
            return Err(storage_err(&path, e));
        }

        debug!(path = %path.display(), "upload overwritten");
        Ok(())
    }
}
