//! Filesystem adapter: the handful of timestamp/path operations the engine
//! needs, behind a trait so tests can swap in an in-memory fake instead of
//! touching the real disk.

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn mtime_seconds(meta: &std::fs::Metadata) -> io::Result<u64> {
    let modified = meta.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs())
}

pub trait FileSystem {
    /// 0 if the path doesn't exist, else its mtime in seconds.
    fn timestamp(&self, path: &str) -> io::Result<u64>;
    /// Updates a path's mtime to now, without touching its contents.
    fn touch(&self, path: &str) -> io::Result<()>;
    /// Ensures every directory component of `path` exists.
    fn create_parent_dirs(&self, path: &str) -> io::Result<()>;
    /// Removes `path`. Returns `Ok(false)` rather than erroring if it was
    /// already absent.
    fn remove(&self, path: &str) -> io::Result<bool>;
}

#[derive(Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem
    }
}

impl FileSystem for RealFileSystem {
    fn timestamp(&self, path: &str) -> io::Result<u64> {
        match std::fs::metadata(path) {
            Ok(meta) => mtime_seconds(&meta),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err),
        }
    }

    fn touch(&self, path: &str) -> io::Result<()> {
        let file = std::fs::OpenOptions::new().write(true).open(path)?;
        file.set_modified(SystemTime::now())
    }

    fn create_parent_dirs(&self, path: &str) -> io::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}
