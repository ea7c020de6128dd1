//! Common utilities shared across sshb crates.
//!
//! This crate carries the small pieces every other crate leans on:
//! - `text_sanitize` - field sanitization for history records
//! - `file_permissions` - mode-explicit file and directory creation
//! - `file_locking` - advisory locks for offline history rewrites
//! - `dirs` - sshb home and default file locations

pub mod dirs;
pub mod file_locking;
pub mod file_permissions;
pub mod text_sanitize;

pub use dirs::{default_history_path, sshb_home};
pub use file_locking::{FileLockError, FileLockGuard, LockConfig, acquire_exclusive_lock};
pub use file_permissions::{create_dir_with_mode, open_append_with_mode};
pub use text_sanitize::{flatten_command, sanitize_field};
