use std::time::Duration;

use codeplay::config::{Config, EntryRule};

use super::FIXTURES_PATH;

fn load(name: &str) -> Result<Config, codeplay::ConfigError> {
    Config::from_file(format!("{FIXTURES_PATH}/configs/{name}"))
}

#[test]
fn test_load_valid_config() {
    let config = load("valid_full.toml").expect("Failed to load config");

    assert_eq!(config.supported_languages(), vec!["c", "java", "python"]);
    assert_eq!(config.timeouts.batch(), Duration::from_secs(5));
    assert_eq!(config.timeouts.kill_grace(), Duration::from_millis(500));
    assert_eq!(
        config.scratch_dir(),
        std::path::PathBuf::from("/tmp/codeplay-fixture")
    );

    let java = config.get_language("java").unwrap();
    assert_eq!(java.entry, Some(EntryRule::PublicClass));
    assert!(java.is_compiled());

    let python = config.get_language("python").unwrap();
    assert_eq!(python.run.env.len(), 1);
}

#[test]
fn test_load_minimal_config() {
    let config = load("valid_minimal.toml").expect("Failed to load config");

    assert!(config.languages.contains_key("shell"));
    assert_eq!(config.timeouts.idle(), Duration::from_secs(120));
}

#[test]
fn test_load_invalid_empty_name() {
    assert!(load("invalid_empty_name.toml").is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    assert!(load("invalid_empty_run_command.toml").is_err());
}

#[test]
fn test_load_invalid_entry_without_rule() {
    let err = load("invalid_entry_without_rule.toml").unwrap_err();
    assert!(err.to_string().contains("{entry}"), "{err}");
}

#[test]
fn test_load_invalid_zero_grace() {
    assert!(load("invalid_zero_grace.toml").is_err());
}

#[test]
fn test_load_missing_file() {
    assert!(load("does_not_exist.toml").is_err());
}
