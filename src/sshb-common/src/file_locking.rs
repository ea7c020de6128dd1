//! Advisory file locking for offline history rewrites.
//!
//! The live eternal-history log is append-only and deliberately unlocked;
//! the only writer that rewrites a history file wholesale is the dedup pass,
//! and it must hold an exclusive lock so two concurrent dedup invocations
//! cannot interleave their temp-and-rename cycles.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors from lock acquisition and locked rewrites.
#[derive(Debug, Error)]
pub enum FileLockError {
    /// File not found.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Lock acquisition failed.
    #[error("failed to acquire lock: {0}")]
    LockFailed(String),

    /// Lock wait exceeded the configured timeout.
    #[error("lock timeout exceeded for: {0}")]
    LockTimeout(PathBuf),

    /// I/O error during operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for locking operations.
pub type FileLockResult<T> = Result<T, FileLockError>;

/// Configuration for lock acquisition.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Maximum time to wait for the lock.
    pub timeout: Duration,
    /// Retry interval when the lock is held elsewhere.
    pub retry_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_millis(50),
        }
    }
}

impl LockConfig {
    /// Create a configuration with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Guard holding an exclusive advisory lock; released on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    /// Path of the locked file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entire locked file.
    pub fn read_to_string(&mut self) -> io::Result<String> {
        self.file.seek(io::SeekFrom::Start(0))?;
        let mut content = String::new();
        self.file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Atomically replace the locked file's contents: write to a sibling
    /// temp file, fsync, then rename over the original. The original's
    /// permission bits are preserved by copying them onto the temp file
    /// before the rename.
    pub fn replace_contents(&mut self, content: &[u8]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("rewrite");

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(content)?;
            tmp.sync_all()?;
        }

        if let Ok(metadata) = std::fs::metadata(&self.path) {
            let _ = std::fs::set_permissions(&tmp_path, metadata.permissions());
        }

        std::fs::rename(&tmp_path, &self.path)
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // Advisory locks are released when the fd closes; unlock explicitly
        // so the release is not deferred by a clone of the handle.
        let _ = unlock_file(&self.file);
    }
}

/// Acquire an exclusive advisory lock, retrying until the timeout elapses.
///
/// The file is created if it does not exist.
pub fn acquire_exclusive_lock(
    path: impl AsRef<Path>,
    config: &LockConfig,
) -> FileLockResult<FileLockGuard> {
    let path = path.as_ref().to_path_buf();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                FileLockError::NotFound(path.clone())
            } else {
                FileLockError::Io(e)
            }
        })?;

    let deadline = Instant::now() + config.timeout;
    loop {
        match try_lock_exclusive(&file)? {
            true => return Ok(FileLockGuard { file, path }),
            false if Instant::now() >= deadline => {
                return Err(FileLockError::LockTimeout(path));
            }
            false => std::thread::sleep(config.retry_interval),
        }
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> FileLockResult<bool> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(FileLockError::LockFailed(format!("flock failed: {err}")))
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> FileLockResult<()> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(FileLockError::LockFailed(format!(
            "unlock failed: {}",
            io::Error::last_os_error()
        )))
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> FileLockResult<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock_file(_file: &File) -> FileLockResult<()> {
    Ok(())
}
