//! Bundle construction.

use super::{BundleError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Local configuration sources included in a bundle, in transmission order.
///
/// Relative to the user's home directory; entries that do not exist or are
/// unreadable are skipped silently.
pub const DEFAULT_SOURCES: &[&str] = &[
    ".bashrc",
    ".bash_exports",
    ".bash_functions",
    ".bash_aliases",
    ".bash_completions",
];

/// Statistics from a bundle build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BundleStats {
    /// Sources found and concatenated.
    pub included: usize,
    /// Sources missing or unreadable, skipped without error.
    pub skipped: usize,
    /// Total bundle size in bytes.
    pub size_bytes: u64,
}

/// Builds the transmittable environment bundle.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    preamble: String,
    sources: Vec<PathBuf>,
}

impl BundleBuilder {
    /// Create a builder over an explicit ordered source list.
    pub fn new(preamble: String, sources: Vec<PathBuf>) -> Self {
        Self { preamble, sources }
    }

    /// Ordered source list this builder will attempt to include.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Build the bundle into a fresh temp file.
    ///
    /// The preamble is written first, then each existing and readable source
    /// in order. A missing or unreadable source is skipped, never an error;
    /// only the temp-file allocation or a write failure aborts the build.
    pub async fn build(&self) -> Result<(Bundle, BundleStats)> {
        let mut file = NamedTempFile::with_prefix("sshb-bundle.").map_err(BundleError::TempFile)?;

        let mut stats = BundleStats::default();

        file.write_all(self.preamble.as_bytes())?;

        for source in &self.sources {
            match tokio::fs::read(source).await {
                Ok(content) => {
                    file.write_all(format!("\n# --- {} ---\n", source.display()).as_bytes())?;
                    file.write_all(&content)?;
                    if !content.ends_with(b"\n") {
                        file.write_all(b"\n")?;
                    }
                    stats.included += 1;
                }
                Err(e) => {
                    tracing::debug!("skipping bundle source {}: {}", source.display(), e);
                    stats.skipped += 1;
                }
            }
        }

        file.flush()?;
        stats.size_bytes = file.as_file().metadata()?.len();

        tracing::debug!(
            included = stats.included,
            skipped = stats.skipped,
            size_bytes = stats.size_bytes,
            "bundle built"
        );

        Ok((Bundle { inner: file }, stats))
    }
}

/// A built bundle, owning its temp file.
///
/// The temp file is deleted by [`Bundle::remove`] after successful
/// transmission, and on drop for every failure path.
#[derive(Debug)]
pub struct Bundle {
    inner: NamedTempFile,
}

impl Bundle {
    /// Path of the bundle temp file.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Delete the bundle file. Call once transmission has succeeded.
    pub fn remove(self) -> Result<()> {
        self.inner.close().map_err(BundleError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripts;
    use pretty_assertions::assert_eq;

    fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn bundle_contains_existing_sources_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(dir.path(), ".bashrc", "echo rc\n");
        let missing = dir.path().join(".bash_exports");
        let b = write_source(dir.path(), ".bash_aliases", "alias l='ls'\n");

        let builder = BundleBuilder::new(
            scripts::preamble("alice", "devbox"),
            vec![a, missing, b],
        );
        let (bundle, stats) = builder.build().await.unwrap();

        let content = std::fs::read_to_string(bundle.path()).unwrap();
        assert!(content.starts_with(scripts::INTERPRETER_LINE));

        let rc_at = content.find("echo rc").unwrap();
        let alias_at = content.find("alias l='ls'").unwrap();
        assert!(rc_at < alias_at);

        assert_eq!(stats.included, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn missing_sources_never_abort() {
        let dir = tempfile::tempdir().unwrap();
        let builder = BundleBuilder::new(
            scripts::preamble("alice", "devbox"),
            vec![dir.path().join("nope"), dir.path().join("also-nope")],
        );

        let (bundle, stats) = builder.build().await.unwrap();
        assert_eq!(stats.included, 0);
        assert_eq!(stats.skipped, 2);

        let content = std::fs::read_to_string(bundle.path()).unwrap();
        assert!(content.contains("SSHB_REMOTE_SESSION"));
    }

    #[tokio::test]
    async fn remove_deletes_the_temp_file() {
        let builder = BundleBuilder::new(scripts::preamble("alice", "devbox"), vec![]);
        let (bundle, _stats) = builder.build().await.unwrap();
        let path = bundle.path().to_path_buf();
        assert!(path.exists());

        bundle.remove().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_deletes_the_temp_file() {
        let builder = BundleBuilder::new(scripts::preamble("alice", "devbox"), vec![]);
        let (bundle, _stats) = builder.build().await.unwrap();
        let path = bundle.path().to_path_buf();
        drop(bundle);
        assert!(!path.exists());
    }
}
