//! Error taxonomy for the indexing and query engine.

use std::process::ExitCode;
use thiserror::Error;

/// Top-level error type for every fallible engine operation.
///
/// Variants mirror the taxonomy in the specification's error-handling design:
/// configuration errors, store errors, parse errors, resource errors, and
/// concurrency errors. Each carries enough context to build a human-readable
/// message without the caller re-deriving it.
#[derive(Error, Debug)]
pub enum EngineError {
    // -- Configuration errors --
    #[error("no project directory has been set")]
    ProjectNotSet,

    #[error("invalid project root: {path}")]
    InvalidProjectRoot { path: String },

    #[error("invalid argument sanitizer rule set: {message}")]
    InvalidRuleSet { message: String },

    #[error("build database not found: {path}")]
    BuildDatabaseMissing { path: String },

    // -- Store errors --
    #[error("on-disk schema version {found} is newer than supported version {current}")]
    SchemaTooNew { found: i64, current: i64 },

    #[error("store corruption detected: {message}")]
    StoreCorrupt { message: String },

    #[error("store busy: exhausted retry budget after {attempts} attempts")]
    StoreBusy { attempts: u32 },

    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    // -- Parse errors --
    #[error("fatal parser diagnostic for {file}: {message}")]
    ParserDiagnosticFatal { file: String, message: String },

    #[error("parser crashed while processing {file}")]
    ParserCrash { file: String },

    #[error("parser could not locate header: {header}")]
    ParserMissingHeader { header: String },

    // -- Resource errors --
    #[error("too many open files: {message}")]
    TooManyOpenFiles { message: String },

    #[error("out of memory: {message}")]
    OutOfMemory { message: String },

    // -- Concurrency errors --
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    // -- Passthrough --
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable machine-readable kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProjectNotSet => "ProjectNotSet",
            Self::InvalidProjectRoot { .. } => "InvalidProjectRoot",
            Self::InvalidRuleSet { .. } => "InvalidRuleSet",
            Self::BuildDatabaseMissing { .. } => "BuildDatabaseMissing",
            Self::SchemaTooNew { .. } => "SchemaTooNew",
            Self::StoreCorrupt { .. } => "StoreCorrupt",
            Self::StoreBusy { .. } => "StoreBusy",
            Self::ConstraintViolation { .. } => "ConstraintViolation",
            Self::ParserDiagnosticFatal { .. } => "ParserDiagnosticFatal",
            Self::ParserCrash { .. } => "ParserCrash",
            Self::ParserMissingHeader { .. } => "ParserMissingHeader",
            Self::TooManyOpenFiles { .. } => "TooManyOpenFiles",
            Self::OutOfMemory { .. } => "OutOfMemory",
            Self::Cancelled => "Cancelled",
            Self::Timeout { .. } => "Timeout",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::Io(_) => "Io",
            Self::Sqlite(_) => "Sqlite",
            Self::Json(_) => "Json",
        }
    }

    /// Whether this kind is fatal to an open store (forces abort or
    /// recreation) as opposed to recoverable/logged-and-continue.
    pub fn is_fatal_store_error(&self) -> bool {
        matches!(self, Self::SchemaTooNew { .. } | Self::StoreCorrupt { .. })
    }

    /// Process exit code for CLI use. Library callers should match on
    /// `kind()` instead of relying on this.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ProjectNotSet
            | Self::InvalidProjectRoot { .. }
            | Self::InvalidRuleSet { .. }
            | Self::BuildDatabaseMissing { .. }
            | Self::FileNotFound { .. } => ExitCode::from(1),
            Self::SchemaTooNew { .. } | Self::StoreCorrupt { .. } => ExitCode::from(2),
            Self::StoreBusy { .. } | Self::ConstraintViolation { .. } => ExitCode::from(3),
            Self::ParserDiagnosticFatal { .. }
            | Self::ParserCrash { .. }
            | Self::ParserMissingHeader { .. } => ExitCode::from(4),
            Self::TooManyOpenFiles { .. } | Self::OutOfMemory { .. } => ExitCode::from(5),
            Self::Cancelled | Self::Timeout { .. } => ExitCode::from(6),
            Self::Io(_) | Self::Sqlite(_) | Self::Json(_) => ExitCode::from(1),
        }
    }
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
