//! Configuration file loading for codeplay
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.kill_grace_ms == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.kill_grace_ms must be positive".to_owned(),
            ));
        }

        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty extension"
                )));
            }
            if lang.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile
                && compile.command.is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty compile command"
                )));
            }
            if lang.entry.is_none()
                && lang
                    .compile
                    .iter()
                    .flat_map(|compile| &compile.command)
                    .chain(&lang.run.command)
                    .any(|arg| arg.contains("{entry}"))
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' uses {{entry}} without an entry rule"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryRule;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[languages.test]
name = "Test Language"
extension = "test"

[languages.test.run]
command = ["./test"]
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert!(config.languages.contains_key("test"));
        assert_eq!(config.languages["test"].name, "Test Language");
        assert_eq!(config.timeouts.idle_ms, 120_000);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
scratch_dir = "/var/tmp/codeplay"

[timeouts]
batch_ms = 2000
idle_ms = 5000

[languages.java]
name = "Java"
extension = "java"
entry = "public-class"

[languages.java.compile]
command = ["javac", "{source}"]

[languages.java.run]
command = ["java", "-cp", "{dir}", "{entry}"]
env = { JAVA_TOOL_OPTIONS = "-Xss8m" }
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(
            config.scratch_dir,
            Some(std::path::PathBuf::from("/var/tmp/codeplay"))
        );
        assert_eq!(config.timeouts.batch_ms, 2000);
        assert_eq!(config.timeouts.idle_ms, 5000);
        // unspecified timer fields keep their defaults
        assert_eq!(config.timeouts.kill_grace_ms, 1000);
        assert_eq!(config.timeouts.input_delay_ms, 100);

        let java = &config.languages["java"];
        assert_eq!(java.entry, Some(EntryRule::PublicClass));
        assert!(java.compile.is_some());
        assert_eq!(java.run.env.len(), 1);
        assert!(java.run.env.values().any(|v| v == "-Xss8m"));
    }

    #[test]
    fn test_default_languages_included() {
        let config = Config::default();
        for id in ["c", "cpp", "python", "java", "javascript", "php", "go"] {
            assert!(config.languages.contains_key(id), "missing {id}");
        }
        assert_eq!(config.languages.len(), 7);
    }

    #[test]
    fn test_invalid_empty_name() {
        let toml = r#"
[languages.test]
name = ""
extension = "test"

[languages.test.run]
command = ["./test"]
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_empty_run_command() {
        let toml = r#"
[languages.test]
name = "Test"
extension = "test"

[languages.test.run]
command = []
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_extension_with_dot() {
        let toml = r#"
[languages.test]
name = "Test"
extension = ".test"

[languages.test.run]
command = ["./test"]
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_entry_placeholder_requires_rule() {
        let toml = r#"
[languages.test]
name = "Test"
extension = "test"

[languages.test.run]
command = ["run", "{entry}"]
"#;

        let err = Config::parse_toml(toml).unwrap_err();
        assert!(err.to_string().contains("{entry}"));
    }

    #[test]
    fn test_zero_grace_rejected() {
        let toml = r#"
[timeouts]
kill_grace_ms = 0
"#;

        assert!(Config::parse_toml(toml).is_err());
    }
}
