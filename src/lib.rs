#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! Incremental symbol and call-graph index for large C++ codebases.
//!
//! Given a compilation database, this engine indexes every translation
//! unit with libclang, persists symbols and call sites to a SQLite-backed
//! store, and serves structural queries (class hierarchies, call paths,
//! overload sets) against that store while tolerating concurrent
//! incremental refreshes.
//!
//! The top-level entry point is [`engine::Engine`]; everything else is a
//! subsystem it coordinates.

pub mod args;
pub mod builddb;
pub mod cache_dir;
pub mod cli;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod header_tracker;
pub mod model;
pub mod progress;
pub mod query;
pub mod refresh;
pub mod scanner;
pub mod store;

pub use engine::{Engine, EngineState, RefreshMode};
pub use error::{EngineError, Result};
pub use model::{
    Access, CallSite, FileMetadata, HeaderDependency, HeaderOwnership, Symbol, SymbolKind,
    TemplateKind,
};
pub use query::{HierarchyDirection, Pattern, SearchFilters};
