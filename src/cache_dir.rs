//! Per-project cache directory layout (§3.2, §6.2).
//!
//! Each indexed project gets its own directory under the user's cache home,
//! keyed by a deterministic hash of the canonicalized project root so the
//! same project always resolves to the same directory regardless of which
//! CWD the engine was launched from.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::model::CacheIdentity;

/// Current on-disk schema version. Bumped whenever the store schema changes
/// incompatibly; see `store::schema`.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Layout of one project's cache directory.
#[derive(Debug, Clone)]
pub struct CacheDir {
    pub root: PathBuf,
}

impl CacheDir {
    /// Resolve the cache directory for `project_root`, creating it (and its
    /// parent) if it does not yet exist.
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let canonical = project_root
            .canonicalize()
            .map_err(|_| EngineError::InvalidProjectRoot {
                path: project_root.display().to_string(),
            })?;
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let key = project_key(&canonical);
        let root = base.join("cxx-index-engine").join(key);
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn symbols_db_path(&self) -> PathBuf {
        self.root.join("symbols.db")
    }

    pub fn header_tracker_path(&self) -> PathBuf {
        self.root.join("header_tracker.json")
    }

    pub fn parse_errors_path(&self) -> PathBuf {
        self.root.join("parse_errors.jsonl")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    /// Remove the entire cache directory contents (but not the directory
    /// itself), used when the cache identity triple no longer matches and a
    /// fresh cache must be built (§6.2).
    pub fn recreate(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Deterministic, filesystem-safe key derived from a canonicalized project
/// root path.
fn project_key(canonical_root: &Path) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    let hash = xxh3_64(canonical_root.to_string_lossy().as_bytes());
    let leaf = canonical_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let sanitized_leaf: String = leaf
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{sanitized_leaf}-{hash:016x}")
}

/// Whether `on_disk` matches `expected`, per the cache identity triple
/// described in §3.2/§6.2. A mismatch in any component means the cache must
/// be recreated rather than reused.
pub fn identity_matches(on_disk: &CacheIdentity, expected: &CacheIdentity) -> bool {
    on_disk == expected
}
