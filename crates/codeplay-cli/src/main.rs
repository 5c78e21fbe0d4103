//! Codeplay CLI
//!
//! A command-line tool for running code in batch mode or as an interactive
//! session.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeplay::{
    BatchRequest, Config, EXAMPLE_CONFIG, EventStream, Runner, SessionEvent, SessionId,
    StartRequest, StartResponse, StreamKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codeplay")]
#[command(about = "A tool for running code in batch mode or interactive sessions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: codeplay.toml)
        #[arg(short, long, default_value = "codeplay.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program to completion with scripted input
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., c, python, java)
        #[arg(short, long)]
        language: String,

        /// Input line (repeatable, sent in order)
        #[arg(short, long = "input", value_name = "LINE")]
        inputs: Vec<String>,

        /// File whose lines are sent after any --input lines
        #[arg(long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session bridged to this terminal
    Session {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., javascript, python)
        #[arg(short, long)]
        language: String,

        /// Print events as JSON lines instead of raw output
        #[arg(long)]
        json: bool,
    },

    /// List configured languages and whether their tools are installed
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            inputs,
            input_file,
            json,
        } => run_batch(config, &source, language, inputs, input_file.as_deref(), json).await,
        Commands::Session {
            source,
            language,
            json,
        } => run_session(config, &source, language, json).await,
        Commands::Languages => {
            list_languages(config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_batch(
    config: Config,
    source: &Path,
    language: String,
    mut inputs: Vec<String>,
    input_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    if let Some(path) = input_file {
        let content = tokio::fs::read_to_string(path)
            .await
            .context("failed to read input file")?;
        inputs.extend(content.lines().map(str::to_owned));
    }

    info!(%language, inputs = inputs.len(), "running program");

    let (runner, _events) = Runner::new(config);
    let result = runner
        .run_code_with_input(&BatchRequest {
            language,
            code,
            inputs,
        })
        .await;

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else if result.success {
        println!("{}", result.output);
    } else {
        eprintln!("{}", result.output);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_session(config: Config, source: &Path, language: String, json: bool) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let (runner, mut events) = Runner::new(config);
    let id = match runner.start_run(&StartRequest { language, code }).await {
        StartResponse::Started { session_id } => session_id,
        StartResponse::Failed { error } => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    info!(session = %id, "session started, type input lines (Ctrl-C to stop)");

    // terminal lines become session input
    let input_runner = runner.clone();
    let input_id = id.clone();
    let forward = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let ack = input_runner.send_input(&input_id, &line).await;
            if let Some(error) = ack.error {
                warn!(%error, "input rejected");
                break;
            }
        }
    });

    let stopper = runner.clone();
    let stop_id = id.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping session");
            stopper.stop_run(&stop_id).await;
        }
    });

    let code = relay_events(&mut events, &id, json).await?;
    forward.abort();

    std::process::exit(code);
}

/// Print events of session `id` until it exits; returns the process exit code
async fn relay_events(events: &mut EventStream, id: &SessionId, json: bool) -> Result<i32> {
    while let Some(event) = events.recv().await {
        if event.session_id() != id {
            continue;
        }

        if json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            SessionEvent::Output {
                stream_kind, data, ..
            } if !json => match stream_kind {
                StreamKind::Stdout => {
                    print!("{data}");
                    std::io::stdout().flush()?;
                }
                StreamKind::Stderr => {
                    eprint!("{data}");
                }
            },
            SessionEvent::Exit { exit, .. } => {
                info!(exit_code = exit.exit_code, signal = exit.signal, "session ended");
                return Ok(exit.exit_code.unwrap_or(1));
            }
            SessionEvent::Output { .. } => {}
        }
    }

    anyhow::bail!("event stream closed before the session exited")
}

fn list_languages(config: Config) {
    let (runner, _events) = Runner::new(config);
    println!("Available languages:\n");

    for (id, available) in runner.check_all_languages() {
        let Ok(lang) = runner.config().get_language(&id) else {
            continue;
        };
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        let status = if available { "" } else { " [not installed]" };
        println!("  {:<15} {} ({}){}", id, lang.name, lang_type, status);
    }
}

fn show_config(config: &Config) {
    println!("Timeouts:");
    println!("  Batch run: {:?}", config.timeouts.batch());
    println!("  Session idle: {:?}", config.timeouts.idle());
    println!("  Kill grace: {:?}", config.timeouts.kill_grace());
    println!("  Input delay: {:?}", config.timeouts.input_delay());
    println!();
    println!("Scratch directory: {}", config.scratch_dir().display());
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
