//! Read-text / write-text collaborators.
//!
//! The patch core never touches the filesystem itself; it goes through
//! [`TextIo`]. [`FsTextIo`] is the real implementation with atomic writes,
//! [`MemoryTextIo`] keeps files in memory for previews and tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    Utf8 { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait TextIo {
    fn read_text(&self, path: &Path) -> Result<String, IoError>;

    /// Replace the whole contents of `path`. Either the new text is fully in
    /// place afterwards or the old contents are untouched.
    fn write_text(&self, path: &Path, text: &str) -> Result<(), IoError>;
}

/// Filesystem collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTextIo;

impl TextIo for FsTextIo {
    fn read_text(&self, path: &Path) -> Result<String, IoError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => IoError::NotFound {
                path: path.to_path_buf(),
            },
            _ => IoError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        String::from_utf8(bytes).map_err(|_| IoError::Utf8 {
            path: path.to_path_buf(),
        })
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<(), IoError> {
        atomic_write(path, text.as_bytes()).map_err(|source| IoError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The tempfile lives in the target's directory so the rename stays on one
/// filesystem. The original file's permissions are carried over.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;

    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// In-memory collaborator. Counts writes so callers can assert on them.
#[derive(Debug, Default)]
pub struct MemoryTextIo {
    files: RefCell<HashMap<PathBuf, String>>,
    writes: Cell<usize>,
}

impl MemoryTextIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), text.into());
        self
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl TextIo for MemoryTextIo {
    fn read_text(&self, path: &Path) -> Result<String, IoError> {
        self.get(path).ok_or_else(|| IoError::NotFound {
            path: path.to_path_buf(),
        })
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<(), IoError> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), text.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("routes.js");
        fs::write(&file, "original").unwrap();

        FsTextIo.write_text(&file, "modified").unwrap();
        assert_eq!(FsTextIo.read_text(&file).unwrap(), "modified");
    }

    #[test]
    fn test_fs_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = FsTextIo
            .read_text(&temp_dir.path().join("missing.js"))
            .unwrap_err();
        assert!(matches!(err, IoError::NotFound { .. }));
    }

    #[test]
    fn test_fs_rejects_non_utf8() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("binary.js");
        fs::write(&file, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            FsTextIo.read_text(&file),
            Err(IoError::Utf8 { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("script.js");
        fs::write(&file, "#!/usr/bin/env node\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();

        FsTextIo.write_text(&file, "#!/usr/bin/env node\nmain();\n").unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_memory_counts_writes() {
        let io = MemoryTextIo::new().with_file("a.js", "x");
        assert_eq!(io.read_text(Path::new("a.js")).unwrap(), "x");
        io.write_text(Path::new("a.js"), "y").unwrap();
        assert_eq!(io.get("a.js").as_deref(), Some("y"));
        assert_eq!(io.write_count(), 1);
        assert!(matches!(
            io.read_text(Path::new("b.js")),
            Err(IoError::NotFound { .. })
        ));
    }
}
