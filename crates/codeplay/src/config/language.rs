use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::config::entry::EntryRule;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "C++ (g++)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Rule for deriving the entry symbol from source (symbol-driven languages only)
    #[serde(default)]
    pub entry: Option<EntryRule>,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Programs that must be installed for this language to work
    ///
    /// Commands whose program is itself a placeholder (a freshly compiled
    /// binary) contribute nothing.
    pub fn required_programs(&self) -> Vec<&str> {
        self.compile
            .iter()
            .map(|compile| &compile.command)
            .chain(std::iter::once(&self.run.command))
            .filter_map(|command| command.first())
            .filter(|program| !program.contains('{'))
            .map(String::as_str)
            .collect()
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], vars: &CommandVars<'_>) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", vars.source)
                    .replace("{output}", vars.binary)
                    .replace("{binary}", vars.binary)
                    .replace("{dir}", vars.dir)
                    .replace("{entry}", vars.entry.unwrap_or_default())
            })
            .collect()
    }
}

/// Values substituted into command templates
#[derive(Debug, Clone, Copy)]
pub struct CommandVars<'a> {
    /// `{source}`: path of the written source file
    pub source: &'a str,
    /// `{binary}` / `{output}`: path of the compiled executable
    pub binary: &'a str,
    /// `{dir}`: directory holding the source file
    pub dir: &'a str,
    /// `{entry}`: extracted entry symbol
    pub entry: Option<&'a str>,
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}, {dir}, {entry}
    pub command: Vec<String>,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}, {dir}, {entry}
    pub command: Vec<String>,

    /// Environment Variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn file_extension_rejects_all_strings_with_slash(s in ".*/.*.") {
            prop_assert!(FileExtension::new(&s).is_err());
        }

        #[test]
        fn file_extension_accepts_alphanumeric(s in "[a-zA-Z0-9_-]+") {
            prop_assert!(FileExtension::new(&s).is_ok());
        }

        #[test]
        fn expand_command_preserves_args_without_placeholders(
            args in proptest::collection::vec("[a-z]+", 1..10)
        ) {
            let vars = CommandVars { source: "s", binary: "b", dir: "d", entry: Some("e") };
            let result = Language::expand_command(&args, &vars);
            prop_assert_eq!(result, args);
        }
    }
}
