//! Scratch workspace management
//!
//! Every run gets a unique base name (`temp_<millis>_<random>`) inside one
//! process-wide scratch directory. All files a run produces start with that
//! base name, which lets [`Artifacts`] sweep compiler side files it never
//! tracked explicitly.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, instrument};

pub use crate::workspace::artifacts::Artifacts;
use crate::config::{CommandVars, Language};

mod artifacts;

/// Prefix shared by every allocated base name
const STEM_PREFIX: &str = "temp_";

/// Scratch directory in which runs are materialized
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the scratch directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory tree if it is missing
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Reserve a base name no other outstanding run is using
    #[instrument(skip(self))]
    pub async fn allocate(&self) -> io::Result<BasePath> {
        self.ensure().await?;

        loop {
            let base = BasePath::new(&self.root, generate_stem());
            if self.artifacts_of(&base).await?.is_empty() {
                debug!(stem = base.stem(), "allocated base path");
                return Ok(base);
            }
        }
    }

    /// Write the source file for `language` and return where everything lives.
    ///
    /// Languages with an entry rule get a directory of their own holding a
    /// source file named after the entry symbol, so two runs declaring the
    /// same class never collide.
    #[instrument(skip(self, language, code), fields(stem = base.stem()))]
    pub async fn write_source(
        &self,
        base: &BasePath,
        language: &Language,
        code: &str,
        entry: Option<&str>,
    ) -> io::Result<RunLayout> {
        let (dir, file_stem) = match entry {
            Some(entry) => {
                let dir = base.path();
                tokio::fs::create_dir_all(&dir).await?;
                (dir, entry.to_owned())
            }
            None => (self.root.clone(), base.stem().to_owned()),
        };

        let source = dir.join(format!("{file_stem}.{}", language.extension));
        let binary = dir.join(format!("{file_stem}{}", std::env::consts::EXE_SUFFIX));

        tokio::fs::write(&source, code).await?;
        debug!(source = %source.display(), "wrote source file");

        Ok(RunLayout {
            dir,
            source,
            binary,
            entry: entry.map(str::to_owned),
        })
    }

    /// Every scratch entry whose name starts with the base name
    pub async fn artifacts_of(&self, base: &BasePath) -> io::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(base.stem()) {
                found.push(entry.path());
            }
        }
        Ok(found)
    }

    /// Start tracking artifacts for a freshly allocated base path
    pub fn artifacts(&self, base: &BasePath) -> Artifacts {
        Artifacts::new(self.root.clone(), base.stem().to_owned())
    }
}

/// Unique base name of one run inside the scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    root: PathBuf,
    stem: String,
}

impl BasePath {
    fn new(root: &Path, stem: String) -> Self {
        Self {
            root: root.to_path_buf(),
            stem,
        }
    }

    /// File name stem shared by all of this run's artifacts
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// `<scratch>/<stem>`
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.stem)
    }
}

/// Where a run's source, binary and working directory live
#[derive(Debug, Clone)]
pub struct RunLayout {
    /// Directory holding the source; used as the working directory
    pub dir: PathBuf,
    pub source: PathBuf,
    /// Output path handed to compilers (may never be created)
    pub binary: PathBuf,
    pub entry: Option<String>,
}

impl RunLayout {
    /// Expand a command template against this layout
    pub fn expand(&self, command: &[String]) -> Vec<String> {
        let source = self.source.to_string_lossy();
        let binary = self.binary.to_string_lossy();
        let dir = self.dir.to_string_lossy();
        let vars = CommandVars {
            source: &source,
            binary: &binary,
            dir: &dir,
            entry: self.entry.as_deref(),
        };
        Language::expand_command(command, &vars)
    }
}

/// `temp_<unix millis>_<6 random hex digits>`
fn generate_stem() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{STEM_PREFIX}{millis}_{}", &random[..6])
}
