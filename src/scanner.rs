//! File-Change Scanner (§4.5): classifies project source files against
//! stored and in-memory state so the Incremental Refresh Engine knows what
//! to re-parse.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::builddb::BuildDatabase;
use crate::error::Result;
use crate::store::Store;

/// Classification of every known source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

impl Changeset {
    pub fn is_empty_of_work(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// In-memory file-hash map maintained by the engine between refreshes
/// (§4.8's "loads in-memory file-hash map ... from the store").
#[derive(Debug, Clone, Default)]
pub struct FileHashMap {
    hashes: HashMap<PathBuf, String>,
}

impl FileHashMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, hash: String) {
        self.hashes.insert(path, hash);
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.hashes.get(path).map(String::as_str)
    }

    pub fn remove(&mut self, path: &Path) {
        self.hashes.remove(path);
    }
}

fn compute_content_hash(path: &Path) -> Result<String> {
    use xxhash_rust::xxh3::xxh3_64;
    let bytes = std::fs::read(path)?;
    Ok(format!("{:016x}", xxh3_64(&bytes)))
}

/// Scan `build_database`'s source entries against `store` and `memory_hashes`,
/// producing a `Changeset` per the classification rules of §4.5.
pub fn scan(
    build_database: &BuildDatabase,
    store: &Store,
    memory_hashes: &FileHashMap,
) -> Result<Changeset> {
    let mut changeset = Changeset::default();
    let mut seen_paths: Vec<PathBuf> = Vec::with_capacity(build_database.commands.len());

    for command in &build_database.commands {
        let path = &command.file;
        seen_paths.push(path.clone());

        if !path.is_file() {
            // Listed in the build database but absent on disk; treated the
            // same as a stored-but-missing path below.
            continue;
        }

        let content_hash = compute_content_hash(path)?;
        let compile_args_hash = args_hash(&command.arguments);
        let stored = store.file_metadata(&path.display().to_string())?;

        let classification = match stored {
            Some(meta) => {
                if meta.compile_args_hash != compile_args_hash {
                    Classification::Modified
                } else if meta.content_hash != content_hash {
                    Classification::Modified
                } else {
                    Classification::Unchanged
                }
            }
            None => {
                // No stored row. Fall back to the in-memory hash map for the
                // freshly-loaded-cache case (§4.5 rule 2, §8 S4): a matching
                // in-memory hash means this was already indexed this
                // process lifetime and must not be reported as Added.
                match memory_hashes.get(path) {
                    Some(mem_hash) if mem_hash == content_hash => Classification::Unchanged,
                    _ => Classification::Added,
                }
            }
        };

        match classification {
            Classification::Added => changeset.added.push(path.clone()),
            Classification::Modified => changeset.modified.push(path.clone()),
            Classification::Unchanged => changeset.unchanged.push(path.clone()),
        }
    }

    for stored_path in store.all_file_paths()? {
        let path = PathBuf::from(&stored_path);
        if !seen_paths.contains(&path) {
            changeset.deleted.push(path);
        }
    }

    Ok(changeset)
}

enum Classification {
    Added,
    Modified,
    Unchanged,
}

fn args_hash(arguments: &[String]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(arguments.join("\u{1}").as_bytes()))
}
