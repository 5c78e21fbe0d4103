use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::entry::EntryRule;
pub use crate::config::language::{CommandVars, CompileConfig, FileExtension, Language, RunConfig};

pub mod entry;
pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../codeplay.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Unsupported language: {id}. Supported languages: {}", .supported.join(", "))]
    UnsupportedLanguage { id: String, supported: Vec<String> },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for codeplay
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding per-run sources and binaries
    /// (defaults to `codeplay` under the system temp directory).
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Timers governing batch runs and sessions
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Language configurations keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

/// Timer settings, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Absolute limit for a batch run, measured from spawn
    pub batch_ms: u64,

    /// A session with no input or output for this long is terminated
    pub idle_ms: u64,

    /// Delay between the graceful termination signal and the forced kill
    pub kill_grace_ms: u64,

    /// Pause between scripted batch inputs
    pub input_delay_ms: u64,
}

impl Timeouts {
    pub fn batch(&self) -> Duration {
        Duration::from_millis(self.batch_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn input_delay(&self) -> Duration {
        Duration::from_millis(self.input_delay_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            batch_ms: 10_000,
            idle_ms: 120_000,
            kill_grace_ms: 1_000,
            input_delay_ms: 100,
        }
    }
}

impl Config {
    /// Create a new config with embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            scratch_dir: None,
            timeouts: Timeouts::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by ID
    ///
    /// Unknown IDs produce an error enumerating every supported ID.
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(id)
            .ok_or_else(|| ConfigError::UnsupportedLanguage {
                id: id.to_owned(),
                supported: self.supported_languages(),
            })
    }

    /// All configured language IDs, sorted
    pub fn supported_languages(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.languages.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get the scratch directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("codeplay"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}
