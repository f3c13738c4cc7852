//! Newline-delimited JSON wire protocol between the coordinator (parent)
//! process and extractor worker (child) processes.
//!
//! Workers are separate OS processes (§4.4/§5), so the process-wide Header
//! Tracker lives in the coordinator; workers consult it via a synchronous
//! `ClaimHeader` round trip embedded in this protocol rather than sharing
//! memory.

use serde::{Deserialize, Serialize};

use crate::builddb::CompileCommand;
use crate::header_tracker::ClaimOutcome;
use crate::model::{CallSite, FileMetadata, HeaderDependency, HeaderOwnership, ParseError, Symbol};

/// A message sent from the coordinator to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoordinatorMessage {
    /// Assign one source file for extraction.
    ExtractFile {
        path: String,
        project_root: String,
        arguments: Vec<String>,
        build_database_version_hash: String,
    },
    /// Response to a worker's `ClaimHeader` request.
    ClaimHeaderResult { outcome: ClaimResult },
    /// Tell the worker to clear per-file scratch state and exit cleanly.
    Shutdown,
}

/// Serializable mirror of `ClaimOutcome` (kept separate so the wire format
/// doesn't silently change if the in-process enum grows non-serializable
/// variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimResult {
    Claimed,
    InProgress,
    AlreadyDone,
}

impl From<ClaimOutcome> for ClaimResult {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Claimed => ClaimResult::Claimed,
            ClaimOutcome::InProgress => ClaimResult::InProgress,
            ClaimOutcome::AlreadyDone => ClaimResult::AlreadyDone,
        }
    }
}

/// A message sent from a worker to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    /// Mid-extraction request to claim a header before extracting its
    /// cursors.
    ClaimHeader {
        header_path: String,
        content_hash: String,
        build_database_version_hash: String,
    },
    /// Mid-extraction notice that a previously claimed header finished.
    HeaderCompleted {
        header_path: String,
        content_hash: String,
        build_database_version_hash: String,
    },
    /// Extraction finished successfully.
    TaskResult {
        path: String,
        symbols: Vec<Symbol>,
        call_sites: Vec<CallSite>,
        headers_observed: Vec<String>,
        file_metadata: FileMetadata,
        header_dependencies: Vec<HeaderDependency>,
        header_ownership: Vec<HeaderOwnership>,
    },
    /// Extraction failed; the file was not written to the store.
    TaskFailed { path: String, error: ParseError },
    /// Heartbeat acknowledging `Shutdown` once scratch state is cleared.
    ShutdownAck,
}

/// Helper for building a worker's `ExtractFile` task from a compile
/// command, used by the coordinator when dispatching.
pub fn extract_file_message(
    command: &CompileCommand,
    project_root: &std::path::Path,
    build_database_version_hash: &str,
) -> CoordinatorMessage {
    CoordinatorMessage::ExtractFile {
        path: command.file.display().to_string(),
        project_root: project_root.display().to_string(),
        arguments: command.arguments.clone(),
        build_database_version_hash: build_database_version_hash.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_messages_roundtrip_through_json() {
        let msg = CoordinatorMessage::ExtractFile {
            path: "/proj/a.cpp".into(),
            project_root: "/proj".into(),
            arguments: vec!["clang++".into()],
            build_database_version_hash: "h1".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: CoordinatorMessage = serde_json::from_str(&json).unwrap();
        match back {
            CoordinatorMessage::ExtractFile { path, .. } => assert_eq!(path, "/proj/a.cpp"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn worker_messages_roundtrip_through_json() {
        let msg = WorkerMessage::ClaimHeader {
            header_path: "/proj/widget.h".into(),
            content_hash: "h1".into(),
            build_database_version_hash: "bdb1".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: WorkerMessage = serde_json::from_str(&json).unwrap();
        match back {
            WorkerMessage::ClaimHeader { header_path, .. } => {
                assert_eq!(header_path, "/proj/widget.h")
            }
            _ => panic!("wrong variant"),
        }
    }
}
