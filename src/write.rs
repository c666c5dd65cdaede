use crate::document::SourceDocument;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{path} changed on disk after it was read (expected xxh3 {expected:016x}, found {found:016x})")]
    ConcurrentModification {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WriteError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Replace `path` with the serialised document.
///
/// The file is re-read first and must still hash to the fingerprint taken when
/// the document was loaded. The new content then goes through
/// [`atomic_write`], so the destination is either fully old or fully new.
pub fn write_document(path: &Path, doc: &SourceDocument) -> Result<(), WriteError> {
    let current = fs::read(path).map_err(|e| WriteError::io(path, e))?;
    let found = xxh3_64(&current);
    if found != doc.fingerprint() {
        return Err(WriteError::ConcurrentModification {
            path: path.to_path_buf(),
            expected: doc.fingerprint(),
            found,
        });
    }

    let content = doc.render();
    atomic_write(path, content.as_bytes())?;

    // Bundlers and dev servers watch mtime; make sure they notice.
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now).map_err(|e| WriteError::io(path, e))?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote target");
    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The temp file lives in the destination's directory so the rename stays on
/// one filesystem. Permissions of an existing destination are carried over.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| WriteError::io(path, e))?;
    temp.write_all(content)
        .map_err(|e| WriteError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| WriteError::io(path, e))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| WriteError::io(path, e))?;
    }

    temp.persist(path).map_err(|e| WriteError::io(path, e.error))?;
    Ok(())
}
