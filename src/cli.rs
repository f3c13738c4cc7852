//! CLI argument definitions using clap.
//!
//! This is deliberately thin: the request/response transport and tool-schema
//! marshalling clients would normally speak to this engine through are out
//! of scope. The CLI only drives [`crate::engine::Engine`] directly, for
//! local development and smoke testing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cxx-index-engine")]
#[command(about = "Incremental symbol and call-graph index for large C++ codebases")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Point the engine at a project root and block until the initial index
    /// completes.
    Index {
        /// Project root containing `compile_commands.json`.
        project_root: PathBuf,

        /// Give up waiting for indexing after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Re-scan an already-indexed project and dispatch changed files.
    Refresh {
        project_root: PathBuf,

        /// Ignore the header tracker and re-extract every file.
        #[arg(long)]
        force_full: bool,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print the engine's current state and indexing progress.
    Status { project_root: PathBuf },

    /// Run one read-only query against an indexed project.
    Query {
        project_root: PathBuf,

        #[command(subcommand)]
        query: QueryCommand,
    },

    /// Internal: run as an extractor worker process. Not for direct use.
    #[command(hide = true, name = "extractor-worker")]
    ExtractorWorker,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Search classes/structs whose qualified name matches `pattern`.
    Classes {
        pattern: String,
        #[arg(long)]
        project_only: bool,
    },
    /// Search functions/methods whose qualified name matches `pattern`.
    Functions {
        pattern: String,
        #[arg(long)]
        project_only: bool,
    },
    /// Detailed info (methods, fields, base classes) for one class.
    ClassInfo { class_name: String },
    /// All overloads of a function/method name.
    FunctionInfo { function_name: String },
    /// Direct subclasses of a class.
    DerivedClasses { class_name: String },
    /// Direct call sites where `function_name` is the callee.
    Callers { function_name: String },
    /// Direct call sites where `function_name` is the caller.
    Callees { function_name: String },
    /// Shortest call path between two functions.
    CallPath {
        from_function: String,
        to_function: String,
        #[arg(long, default_value = "16")]
        max_depth: usize,
    },
    /// Symbols declared directly in `file_path`.
    InFile { file_path: String },
}
