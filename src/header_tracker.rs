//! Process-wide Header Tracker (§4.9).
//!
//! Headers are parsed incidentally by whichever translation unit happens to
//! include them first. The tracker records which file "won" the extraction
//! of a given header for a given build-database version, so redundant work
//! and duplicate symbol emission are avoided across the worker pool. It
//! lives in the coordinator process; workers consult it via IPC (see
//! `coordinator::protocol`).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimRecord {
    content_hash: String,
    build_database_version_hash: String,
    processed_at: i64,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No one has claimed this header for this build-database version yet;
    /// the caller now owns extracting it.
    Claimed,
    /// Another worker is actively extracting this header right now.
    InProgress,
    /// This header was already processed for this build-database version
    /// and content hash; nothing to do.
    AlreadyDone,
}

/// The claim/complete/release surface the Symbol Extractor needs. The
/// in-process `HeaderTracker` implements this directly; extractor workers
/// running as separate OS processes implement it over the coordinator IPC
/// channel instead (see `coordinator::worker`), since they cannot share
/// this mutex with the coordinator process.
pub trait HeaderClaims {
    fn try_claim(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
    ) -> ClaimOutcome;

    fn mark_completed(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
        processed_at: i64,
    );
}

/// Thread-safe, process-wide registry of header-extraction ownership.
#[derive(Default)]
pub struct HeaderTracker {
    done: Mutex<HashMap<PathBuf, ClaimRecord>>,
    in_progress: Mutex<HashSet<PathBuf>>,
}

impl HeaderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to claim `header` for first-win extraction.
    pub fn try_claim(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
    ) -> ClaimOutcome {
        let done = self.done.lock();
        if let Some(record) = done.get(header) {
            if record.content_hash == content_hash
                && record.build_database_version_hash == build_database_version_hash
            {
                return ClaimOutcome::AlreadyDone;
            }
        }
        drop(done);

        let mut in_progress = self.in_progress.lock();
        if in_progress.contains(header) {
            return ClaimOutcome::InProgress;
        }
        in_progress.insert(header.to_path_buf());
        ClaimOutcome::Claimed
    }

    /// Record that `header` finished extraction, releasing the in-progress
    /// claim and recording it as done for this build-database version.
    pub fn mark_completed(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
        processed_at: i64,
    ) {
        self.in_progress.lock().remove(header);
        self.done.lock().insert(
            header.to_path_buf(),
            ClaimRecord {
                content_hash: content_hash.to_string(),
                build_database_version_hash: build_database_version_hash.to_string(),
                processed_at,
            },
        );
    }

    /// Release an in-progress claim without marking it done, e.g. because
    /// the worker holding it crashed (§4.9, §5 crash containment).
    pub fn release_claim(&self, header: &Path) {
        self.in_progress.lock().remove(header);
    }

    /// Drop all tracked state. Called when the build database changes and
    /// every header must be reconsidered from scratch.
    pub fn clear_all(&self) {
        self.done.lock().clear();
        self.in_progress.lock().clear();
    }

    /// Serialize the `done` map to JSON for on-disk persistence between
    /// engine runs (`header_tracker.json` in the cache directory).
    pub fn to_json(&self) -> Result<String> {
        let done = self.done.lock();
        Ok(serde_json::to_string(&*done)?)
    }

    /// Restore the `done` map from a previously persisted JSON document.
    /// In-progress claims are never persisted; a fresh process starts with
    /// none outstanding.
    pub fn load_json(&self, json: &str) -> Result<()> {
        let restored: HashMap<PathBuf, ClaimRecord> = serde_json::from_str(json)?;
        *self.done.lock() = restored;
        Ok(())
    }
}

impl HeaderClaims for HeaderTracker {
    fn try_claim(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
    ) -> ClaimOutcome {
        HeaderTracker::try_claim(self, header, content_hash, build_database_version_hash)
    }

    fn mark_completed(
        &self,
        header: &Path,
        content_hash: &str,
        build_database_version_hash: &str,
        processed_at: i64,
    ) {
        HeaderTracker::mark_completed(
            self,
            header,
            content_hash,
            build_database_version_hash,
            processed_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_succeeds_second_sees_in_progress() {
        let tracker = HeaderTracker::new();
        let header = Path::new("/proj/include/widget.h");
        assert_eq!(
            tracker.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            tracker.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::InProgress
        );
    }

    #[test]
    fn completed_claim_is_already_done_until_content_changes() {
        let tracker = HeaderTracker::new();
        let header = Path::new("/proj/include/widget.h");
        tracker.try_claim(header, "hash1", "bdb1");
        tracker.mark_completed(header, "hash1", "bdb1", 1000);
        assert_eq!(
            tracker.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::AlreadyDone
        );
        assert_eq!(
            tracker.try_claim(header, "hash2", "bdb1"),
            ClaimOutcome::Claimed
        );
    }

    #[test]
    fn released_claim_can_be_reclaimed() {
        let tracker = HeaderTracker::new();
        let header = Path::new("/proj/include/widget.h");
        tracker.try_claim(header, "hash1", "bdb1");
        tracker.release_claim(header);
        assert_eq!(
            tracker.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::Claimed
        );
    }

    #[test]
    fn clear_all_forgets_everything() {
        let tracker = HeaderTracker::new();
        let header = Path::new("/proj/include/widget.h");
        tracker.try_claim(header, "hash1", "bdb1");
        tracker.mark_completed(header, "hash1", "bdb1", 1000);
        tracker.clear_all();
        assert_eq!(
            tracker.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::Claimed
        );
    }

    #[test]
    fn roundtrips_through_json() {
        let tracker = HeaderTracker::new();
        let header = Path::new("/proj/include/widget.h");
        tracker.try_claim(header, "hash1", "bdb1");
        tracker.mark_completed(header, "hash1", "bdb1", 1000);
        let json = tracker.to_json().unwrap();

        let restored = HeaderTracker::new();
        restored.load_json(&json).unwrap();
        assert_eq!(
            restored.try_claim(header, "hash1", "bdb1"),
            ClaimOutcome::AlreadyDone
        );
    }
}
