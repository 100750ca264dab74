//! Durable byte storage for artifacts.
//!
//! The pipeline needs three operations: write a whole artifact, check whether
//! a path exists, and delete a path (used for best-effort cleanup). [`LocalStorage`] implements them on the
//! local filesystem; tests use the in-memory mock in [`tests`].

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Byte-oriented storage keyed by path.
///
/// `Sync` so one storage handle can be shared across rayon workers. Every
/// derivative cell writes a distinct path, so implementations need no
/// cross-path coordination.
pub trait Storage: Sync {
    /// Create or replace the file at `path` with `bytes`.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Remove a file, or a directory and everything below it.
    /// Deleting a path that does not exist succeeds.
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Filesystem storage.
///
/// Writes go to a temporary file next to the destination which is then
/// renamed over it, so readers see either the previous artifact or the new
/// one, never a truncated file. Parent directories are created on demand.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(".upload-").suffix(".tmp");
        // NamedTempFile defaults to 0600; artifacts are served by other processes.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }

        let mut tmp = builder.tempfile_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }
}
