//! Integration tests for codeplay
//!
//! These tests drive real compilers and interpreters. Tests whose toolchain is
//! missing from PATH return early with a note on stderr.
//! Run with: cargo test -p codeplay --features integration-tests

#![cfg(feature = "integration-tests")]

use std::fs;

use codeplay::config::Config;
use codeplay::{EventStream, Runner};

mod batch_execution;
mod config_loading;
mod interactive_execution;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Default languages with a scratch directory private to one test
pub(crate) fn test_runner(name: &str) -> (Runner, EventStream) {
    let mut config = Config::default();
    config.scratch_dir = Some(std::env::temp_dir().join(format!(
        "codeplay-it-{name}-{}",
        std::process::id()
    )));
    Runner::new(config)
}

/// Whether `language` can run here; logs a skip note when it cannot
pub(crate) fn toolchain_available(runner: &Runner, language: &str) -> bool {
    let available = runner.check_language(language);
    if !available {
        eprintln!("skipping: toolchain for '{language}' not installed");
    }
    available
}

/// Whether the runner's scratch directory holds no run artifacts
pub(crate) fn scratch_is_empty(runner: &Runner) -> bool {
    match fs::read_dir(runner.workspace().root()) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
