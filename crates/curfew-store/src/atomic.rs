//! Write-then-rename file replacement

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::StoreError;

/// Failure of [`write_atomic`], split by the step that failed.
///
/// On `Stage` the target is untouched. On `Replace` the new content was
/// fully written next to the target but could not be renamed over it.
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to stage replacement for {}: {source}", path.display())]
    Stage { path: PathBuf, source: io::Error },

    #[error("failed to replace {}: {source}", path.display())]
    Replace { path: PathBuf, source: io::Error },
}

impl AtomicWriteError {
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Stage { source, .. } | Self::Replace { source, .. } => source,
        }
    }

    pub fn into_io_error(self) -> io::Error {
        match self {
            Self::Stage { source, .. } | Self::Replace { source, .. } => source,
        }
    }
}

impl From<AtomicWriteError> for StoreError {
    fn from(e: AtomicWriteError) -> Self {
        StoreError::Io(e.into_io_error())
    }
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// The temp file is created in the target's directory so the final rename
/// stays on one filesystem. Permissions of an existing target are carried
/// over; missing parent directories are created.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AtomicWriteError> {
    let stage = |source| AtomicWriteError::Stage {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(stage)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(stage)?;
    tmp.write_all(contents).map_err(stage)?;
    tmp.as_file().sync_all().map_err(stage)?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(stage)?;
    }

    tmp.persist(path).map_err(|e| AtomicWriteError::Replace {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
