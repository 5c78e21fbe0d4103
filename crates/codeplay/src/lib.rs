//! A library for running user code in several languages.
//!
//! Codeplay compiles (when needed) and runs source code as a local child
//! process, either as a one-shot batch run with scripted input or as a live
//! interactive session that streams output events and accepts input at any
//! time.
//!
//! # Features
//!
//! - **Batch runs** with paced input lines and an absolute timeout.
//! - **Interactive sessions** with idle timeout and explicit stop.
//! - **Escalated termination**: a graceful signal first, a forced kill after a grace period.
//! - **Guaranteed cleanup** of every file a run creates, on every exit path.
//! - **TOML configuration** for per-language compile and run commands.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use runner::{EventStream, RunError, Runner, SessionError, SessionManager};
pub use types::{
    AckResponse, BatchRequest, ExitInfo, RunResult, SessionEvent, SessionId, StartRequest,
    StartResponse, StreamKind,
};
pub use workspace::Workspace;

pub mod config;
pub mod process;
pub mod runner;
pub mod types;
pub mod workspace;
