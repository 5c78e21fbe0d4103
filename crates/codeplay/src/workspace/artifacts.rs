//! Artifact cleanup
//!
//! [`Artifacts`] owns every filesystem byproduct of one run. Cleanup deletes
//! the explicitly tracked paths and then sweeps the scratch directory for
//! anything else carrying the run's stem. Missing files are not an error and
//! deletion failures are logged, never propagated.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

/// Files and directories produced by one run
///
/// # Cleanup
///
/// Call [`cleanup()`](Self::cleanup) once the run is over. If the value is
/// dropped without that (an early return or a panic), `Drop` performs the
/// same deletion synchronously.
#[derive(Debug)]
pub struct Artifacts {
    root: PathBuf,
    stem: String,
    tracked: Vec<PathBuf>,
    cleaned: bool,
}

impl Artifacts {
    pub(crate) fn new(root: PathBuf, stem: String) -> Self {
        Self {
            root,
            stem,
            tracked: Vec::new(),
            cleaned: false,
        }
    }

    /// Record a path for deletion
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.tracked.push(path.into());
    }

    /// Stem shared by the run's files
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Whether cleanup already ran
    pub fn is_cleaned(&self) -> bool {
        self.cleaned
    }

    /// Delete everything belonging to the run.
    ///
    /// Only the first call does any work; later calls return 0.
    /// Returns the number of entries removed.
    #[instrument(skip(self), fields(stem = %self.stem))]
    pub async fn cleanup(&mut self) -> usize {
        if self.cleaned {
            return 0;
        }

        let mut removed = 0;
        for path in std::mem::take(&mut self.tracked) {
            if remove_entry(&path).await {
                removed += 1;
            }
        }

        match tokio::fs::read_dir(&self.root).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        if self.owns(&entry.file_name().to_string_lossy())
                            && remove_entry(&entry.path()).await
                        {
                            removed += 1;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(?e, "failed to scan scratch directory");
                        break;
                    }
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(?e, "failed to scan scratch directory"),
        }

        self.cleaned = true;
        debug!(removed, "artifacts cleaned up");
        removed
    }

    fn owns(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.stem)
    }

    fn cleanup_blocking(&mut self) {
        self.cleaned = true;

        for path in std::mem::take(&mut self.tracked) {
            remove_entry_blocking(&path);
        }

        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if self.owns(&entry.file_name().to_string_lossy()) {
                    remove_entry_blocking(&entry.path());
                }
            }
        }
    }
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        if !self.cleaned {
            warn!(stem = %self.stem, "artifacts dropped without cleanup, removing now");
            self.cleanup_blocking();
        }
    }
}

/// Remove a file or directory tree. Returns whether something was deleted.
async fn remove_entry(path: &Path) -> bool {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    report(path, result)
}

fn remove_entry_blocking(path: &Path) -> bool {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    report(path, result)
}

fn report(path: &Path, result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), ?e, "failed to delete artifact");
            false
        }
    }
}
