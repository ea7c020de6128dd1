//! File permission utilities.
//!
//! The eternal-history log and everything under the sshb home must never be
//! readable by other users, so files here are created with explicit Unix
//! modes rather than relying on the process umask.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Open a file for appending, creating it with the given mode if absent.
///
/// An existing file keeps its permission bits; the mode applies only on
/// creation. On non-Unix platforms the mode is ignored.
pub fn open_append_with_mode(path: impl AsRef<Path>, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);

    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

/// Create a directory (and parents) with exactly the given Unix mode.
pub fn create_dir_with_mode(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(&path)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        std::fs::create_dir_all(path)
    }
}
