//! Compilation step shared by batch runs and sessions
//!
//! Resolves the language, materializes the source in the workspace, compiles
//! it when the language needs that, and builds the command that runs it.

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::process::{ProgramCommand, run_with_output};
use crate::runner::RunError;
use crate::workspace::{Artifacts, BasePath, RunLayout, Workspace};

/// Fallback diagnostic when a compiler fails without saying anything
pub const COMPILATION_FAILED: &str = "Compilation failed";

/// A program ready to be spawned
#[derive(Debug)]
pub struct Prepared<'a> {
    pub language: &'a Language,
    pub layout: RunLayout,
    pub artifacts: Artifacts,
    pub run_command: ProgramCommand,
}

/// Prepare `code` for running as `language_id`
///
/// On error every file written so far has already been removed.
#[instrument(skip(config, workspace, code), fields(code_len = code.len()))]
pub async fn prepare<'a>(
    config: &'a Config,
    workspace: &Workspace,
    language_id: &str,
    code: &str,
) -> Result<Prepared<'a>, RunError> {
    let language = config.get_language(language_id)?;

    // nothing touches the disk when the entry symbol is missing
    let entry = match language.entry {
        Some(rule) => Some(
            rule.extract(code)
                .ok_or(RunError::NoEntrySymbol(rule.missing_message()))?,
        ),
        None => None,
    };

    let base = workspace.allocate().await.map_err(RunError::Workspace)?;
    let mut artifacts = workspace.artifacts(&base);

    match materialize(workspace, &base, language, code, entry.as_deref(), &mut artifacts).await {
        Ok(layout) => {
            let run_command = ProgramCommand::new(layout.expand(&language.run.command))
                .envs(&language.run.env)
                .working_dir(&layout.dir);

            Ok(Prepared {
                language,
                layout,
                artifacts,
                run_command,
            })
        }
        Err(e) => {
            artifacts.cleanup().await;
            Err(e)
        }
    }
}

async fn materialize(
    workspace: &Workspace,
    base: &BasePath,
    language: &Language,
    code: &str,
    entry: Option<&str>,
    artifacts: &mut Artifacts,
) -> Result<RunLayout, RunError> {
    let layout = workspace
        .write_source(base, language, code, entry)
        .await
        .map_err(RunError::Workspace)?;

    artifacts.track(&layout.source);
    if entry.is_some() {
        artifacts.track(&layout.dir);
    }

    if let Some(compile) = &language.compile {
        artifacts.track(&layout.binary);

        let command = ProgramCommand::new(layout.expand(&compile.command))
            .envs(&compile.env)
            .working_dir(&layout.dir);
        let output = run_with_output(&command).await?;

        debug!(
            success = output.is_success(),
            exit = ?output.exit,
            "compilation complete"
        );

        if !output.is_success() {
            let diagnostic = output.diagnostic();
            return Err(RunError::CompileFailed(if diagnostic.is_empty() {
                COMPILATION_FAILED.to_owned()
            } else {
                diagnostic
            }));
        }
    }

    Ok(layout)
}
