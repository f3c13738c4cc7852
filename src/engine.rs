//! Engine State Machine (§4.8): the top-level control surface tying the
//! scanner, coordinator, refresh engine and query engine together.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::args::{self, Rule};
use crate::builddb::BuildDatabase;
use crate::cache_dir::{self, CacheDir};
use crate::coordinator::{self, CancelToken};
use crate::error::{EngineError, Result};
use crate::header_tracker::HeaderTracker;
use crate::model::CacheIdentity;
use crate::progress::{ProgressRecord, ProgressSnapshot};
use crate::refresh;
use crate::scanner::{self, FileHashMap};
use crate::store::Store;

/// The engine's externally observable state (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Indexing { project_root: PathBuf },
    Ready { project_root: PathBuf },
    Refreshing { project_root: PathBuf },
}

/// Refresh mode accepted by `refresh_project`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Incremental,
    ForceFull,
}

struct ActiveProject {
    root: PathBuf,
    cache_dir: CacheDir,
    store: Mutex<Store>,
    build_database: BuildDatabase,
    header_tracker: Arc<HeaderTracker>,
    file_hashes: Mutex<FileHashMap>,
    sanitizer_rules: Vec<Rule>,
}

/// Compare every recorded `HeaderOwnership` row's content hash against the
/// header's current on-disk content, per §4.6 step 2. A header that no
/// longer exists on disk is left out here; its dependent sources still lose
/// header-defined symbols naturally once the header is no longer observed
/// during their next re-parse.
pub fn compute_changed_headers(store: &Store) -> Result<Vec<String>> {
    use xxhash_rust::xxh3::xxh3_64;

    let mut changed = Vec::new();
    for ownership in store.all_header_ownership()? {
        let Ok(bytes) = std::fs::read(&ownership.header_path) else {
            continue;
        };
        let on_disk_hash = format!("{:016x}", xxh3_64(&bytes));
        if on_disk_hash != ownership.content_hash {
            changed.push(ownership.header_path);
        }
    }
    Ok(changed)
}

/// Load `sanitizer_rules.json` from the project root, if present (§4.1). A
/// missing file means no rules apply; compile arguments pass through
/// unmodified.
fn load_sanitizer_rules(project_root: &Path) -> Result<Vec<Rule>> {
    let rules_path = project_root.join("sanitizer_rules.json");
    match std::fs::read_to_string(&rules_path) {
        Ok(json) => args::load_rules(&json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Shared indexing-completion signal used by `wait_for_indexing`.
#[derive(Default)]
struct IndexingDone {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl IndexingDone {
    fn mark_done(&self) {
        let mut done = self.mutex.lock().unwrap();
        *done = true;
        self.condvar.notify_all();
    }

    fn reset(&self) {
        *self.mutex.lock().unwrap() = false;
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = self.mutex.lock().unwrap();
        if *guard {
            return true;
        }
        match timeout {
            Some(d) => {
                let (guard, result) = self.condvar.wait_timeout(guard, d).unwrap();
                let _ = guard;
                !result.timed_out()
            }
            None => {
                let _guard = self.condvar.wait_while(guard, |done| !*done).unwrap();
                true
            }
        }
    }
}

/// Top-level engine: one per process. Cheap to clone (everything behind
/// `Arc`), so the CLI layer and any future transport layer can share one.
#[derive(Clone)]
pub struct Engine {
    state: Arc<RwLock<EngineState>>,
    project: Arc<RwLock<Option<Arc<ActiveProject>>>>,
    progress: Arc<RwLock<Arc<ProgressRecord>>>,
    indexing_done: Arc<IndexingDone>,
    cancel: Arc<RwLock<CancelToken>>,
    worker_binary: PathBuf,
    pool_size: usize,
}

impl Engine {
    pub fn new(worker_binary: PathBuf) -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::Idle)),
            project: Arc::new(RwLock::new(None)),
            progress: Arc::new(RwLock::new(Arc::new(ProgressRecord::new(0)))),
            indexing_done: Arc::new(IndexingDone::default()),
            cancel: Arc::new(RwLock::new(CancelToken::new())),
            worker_binary,
            pool_size: coordinator::default_pool_size(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.read().clone()
    }

    /// `set_project_directory(path)` (§4.8). Sets state before spawning the
    /// background indexing task — observability of the new state must not
    /// wait on that task starting.
    pub fn set_project_directory(&self, path: &Path) -> Result<()> {
        let project_root = path
            .canonicalize()
            .map_err(|_| EngineError::InvalidProjectRoot {
                path: path.display().to_string(),
            })?;

        let cache_dir = CacheDir::for_project(&project_root)?;
        let build_db_path = project_root.join("compile_commands.json");
        let build_database = BuildDatabase::load(&build_db_path)?;

        let expected_identity = CacheIdentity {
            project_root: project_root.display().to_string(),
            build_database_version_hash: build_database.version_hash.clone(),
            schema_version: cache_dir::CURRENT_SCHEMA_VERSION,
        };

        let meta_path = cache_dir.meta_path();
        let on_disk_identity = std::fs::read_to_string(&meta_path)
            .ok()
            .and_then(|text| serde_json::from_str::<StoredIdentity>(&text).ok());

        let identity_matches = on_disk_identity
            .as_ref()
            .map(|stored| stored.matches(&expected_identity))
            .unwrap_or(false);

        if !identity_matches {
            info!(project = %project_root.display(), "cache identity mismatch, recreating cache");
            cache_dir.recreate()?;
            let stored = StoredIdentity::from(&expected_identity);
            std::fs::write(&meta_path, serde_json::to_string(&stored)?)?;
        }

        let sanitizer_rules = load_sanitizer_rules(&project_root)?;

        let store = Store::open(&cache_dir.symbols_db_path())?;
        let header_tracker = Arc::new(HeaderTracker::new());
        if let Ok(json) = std::fs::read_to_string(cache_dir.header_tracker_path()) {
            let _ = header_tracker.load_json(&json);
        }

        let mut file_hashes = FileHashMap::new();
        for path in store.all_file_paths()? {
            if let Ok(meta) = store.file_metadata(&path) {
                if let Some(meta) = meta {
                    file_hashes.insert(PathBuf::from(path), meta.content_hash);
                }
            }
        }

        let active = Arc::new(ActiveProject {
            root: project_root.clone(),
            cache_dir,
            store: Mutex::new(store),
            build_database,
            header_tracker,
            file_hashes: Mutex::new(file_hashes),
            sanitizer_rules,
        });

        *self.project.write() = Some(Arc::clone(&active));

        let changeset = {
            let store_guard = active.store.lock().unwrap();
            let hashes_guard = active.file_hashes.lock().unwrap();
            scanner::scan(&active.build_database, &store_guard, &hashes_guard)?
        };

        if changeset.is_empty_of_work() {
            *self.state.write() = EngineState::Ready {
                project_root: project_root.clone(),
            };
            self.indexing_done.mark_done();
            return Ok(());
        }

        // Commit state before spawning the background task: callers must
        // observe `Indexing` the instant this function returns.
        *self.state.write() = EngineState::Indexing {
            project_root: project_root.clone(),
        };
        self.indexing_done.reset();

        self.spawn_indexing_task(active, changeset);
        Ok(())
    }

    fn spawn_indexing_task(&self, active: Arc<ActiveProject>, changeset: crate::scanner::Changeset) {
        let engine = self.clone();
        std::thread::spawn(move || {
            let impact_paths: Vec<PathBuf> = changeset
                .added
                .into_iter()
                .chain(changeset.modified.into_iter())
                .collect();
            let impact_set = refresh::ImpactSet { paths: impact_paths };

            let total = impact_set.paths.len() as u64;
            let progress = Arc::new(ProgressRecord::new(total));
            *engine.progress.write() = Arc::clone(&progress);

            let cancel = engine.cancel.read().clone();
            let result = {
                let mut store_guard = active.store.lock().unwrap();
                refresh::dispatch_impact_set(
                    &engine.worker_binary,
                    &active.root,
                    &active.build_database,
                    &impact_set,
                    &active.sanitizer_rules,
                    engine.pool_size,
                    Arc::clone(&active.header_tracker),
                    progress,
                    cancel,
                    &mut store_guard,
                )
            };

            if let Err(e) = result {
                warn!(error = %e, "indexing task failed");
            }

            if let Ok(json) = active.header_tracker.to_json() {
                let _ = std::fs::write(active.cache_dir.header_tracker_path(), json);
            }

            *engine.state.write() = EngineState::Ready {
                project_root: active.root.clone(),
            };
            engine.indexing_done.mark_done();
        });
    }

    /// `refresh_project(mode)` (§4.8). Only valid when a project is set.
    pub fn refresh_project(&self, mode: RefreshMode) -> Result<()> {
        let active = {
            let guard = self.project.read();
            guard.clone().ok_or(EngineError::ProjectNotSet)?
        };

        *self.state.write() = EngineState::Refreshing {
            project_root: active.root.clone(),
        };
        self.indexing_done.reset();

        if mode == RefreshMode::ForceFull {
            active.header_tracker.clear_all();
            active.store.lock().unwrap().clear_header_ownership()?;
        }

        let changeset = {
            let store_guard = active.store.lock().unwrap();
            let hashes_guard = active.file_hashes.lock().unwrap();
            scanner::scan(&active.build_database, &store_guard, &hashes_guard)?
        };

        {
            let mut store_guard = active.store.lock().unwrap();
            refresh::apply_deletions(&mut store_guard, &changeset)?;
        }

        let impact_set = {
            let store_guard = active.store.lock().unwrap();
            let changed_headers = compute_changed_headers(&store_guard)?;
            refresh::compute_impact_set(&store_guard, &changeset, &changed_headers)?
        };

        self.spawn_refresh_task(active, impact_set);
        Ok(())
    }

    fn spawn_refresh_task(&self, active: Arc<ActiveProject>, impact_set: refresh::ImpactSet) {
        let engine = self.clone();
        std::thread::spawn(move || {
            let total = impact_set.paths.len() as u64;
            let progress = Arc::new(ProgressRecord::new(total));
            *engine.progress.write() = Arc::clone(&progress);

            let cancel = engine.cancel.read().clone();
            let result = {
                let mut store_guard = active.store.lock().unwrap();
                refresh::dispatch_impact_set(
                    &engine.worker_binary,
                    &active.root,
                    &active.build_database,
                    &impact_set,
                    &active.sanitizer_rules,
                    engine.pool_size,
                    Arc::clone(&active.header_tracker),
                    progress,
                    cancel,
                    &mut store_guard,
                )
            };

            if let Err(e) = result {
                warn!(error = %e, "refresh task failed");
            }

            if let Ok(json) = active.header_tracker.to_json() {
                let _ = std::fs::write(active.cache_dir.header_tracker_path(), json);
            }

            *engine.state.write() = EngineState::Ready {
                project_root: active.root.clone(),
            };
            engine.indexing_done.mark_done();
        });
    }

    /// `wait_for_indexing(timeout)`: blocks until the current indexing or
    /// refresh operation completes, or the timeout elapses.
    pub fn wait_for_indexing(&self, timeout: Option<Duration>) -> Result<()> {
        if self.indexing_done.wait(timeout) {
            return Ok(());
        }
        Err(EngineError::Timeout {
            millis: timeout.map(|d| d.as_millis() as u64).unwrap_or(0),
        })
    }

    /// `get_indexing_status()`.
    pub fn get_indexing_status(&self) -> ProgressSnapshot {
        self.progress.read().snapshot()
    }

    /// `get_server_status()`.
    pub fn get_server_status(&self) -> EngineState {
        self.state()
    }

    pub fn cancel_current_operation(&self) {
        self.cancel.read().cancel();
    }

    /// Borrow the active project's store for a read-only query, if any.
    pub fn with_store<T>(&self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        let guard = self.project.read();
        let active = guard.as_ref().ok_or(EngineError::ProjectNotSet)?;
        let store_guard = active.store.lock().unwrap();
        f(&store_guard)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoredIdentity {
    project_root: String,
    build_database_version_hash: String,
    schema_version: i64,
}

impl StoredIdentity {
    fn matches(&self, expected: &CacheIdentity) -> bool {
        self.project_root == expected.project_root
            && self.build_database_version_hash == expected.build_database_version_hash
            && self.schema_version == expected.schema_version
    }
}

impl From<&CacheIdentity> for StoredIdentity {
    fn from(identity: &CacheIdentity) -> Self {
        Self {
            project_root: identity.project_root.clone(),
            build_database_version_hash: identity.build_database_version_hash.clone(),
            schema_version: identity.schema_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_starts_idle() {
        let engine = Engine::new(PathBuf::from("/usr/bin/true"));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn set_project_directory_rejects_missing_build_database() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(PathBuf::from("/usr/bin/true"));
        let err = engine.set_project_directory(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "BuildDatabaseMissing");
    }

    #[test]
    fn set_project_directory_with_empty_build_database_goes_straight_to_ready() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("compile_commands.json"), "[]").unwrap();
        let engine = Engine::new(PathBuf::from("/usr/bin/true"));
        engine.set_project_directory(dir.path()).unwrap();
        assert!(matches!(engine.state(), EngineState::Ready { .. }));
    }

    #[test]
    fn refresh_without_project_set_is_rejected() {
        let engine = Engine::new(PathBuf::from("/usr/bin/true"));
        let err = engine
            .refresh_project(RefreshMode::Incremental)
            .unwrap_err();
        assert_eq!(err.kind(), "ProjectNotSet");
    }

    #[test]
    fn missing_sanitizer_rules_file_yields_no_rules() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_sanitizer_rules(dir.path()).unwrap(), Vec::new());
    }

    #[test]
    fn malformed_sanitizer_rules_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sanitizer_rules.json"), "not json").unwrap();
        let err = load_sanitizer_rules(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleSet");
    }

    #[test]
    fn set_project_directory_applies_configured_sanitizer_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sanitizer_rules.json"),
            r#"[{"kind": "remove_flag", "pattern": "-Werror", "is_regex": false, "takes_value": false}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("compile_commands.json"), "[]").unwrap();
        let engine = Engine::new(PathBuf::from("/usr/bin/true"));
        engine.set_project_directory(dir.path()).unwrap();
        assert!(matches!(engine.state(), EngineState::Ready { .. }));
    }

    #[test]
    fn compute_changed_headers_detects_drifted_content() {
        use crate::model::HeaderOwnership;

        let dir = tempfile::tempdir().unwrap();
        let header_path = dir.path().join("widget.h");
        std::fs::write(&header_path, b"original").unwrap();
        let original_hash = format!(
            "{:016x}",
            xxhash_rust::xxh3::xxh3_64(b"original")
        );

        let mut store = Store::open_in_memory().unwrap();
        store
            .upsert_header_ownership(&HeaderOwnership {
                header_path: header_path.display().to_string(),
                content_hash: original_hash,
                build_database_version_hash: "bdb1".into(),
                processed_at: 0,
            })
            .unwrap();

        assert!(compute_changed_headers(&store).unwrap().is_empty());

        std::fs::write(&header_path, b"edited").unwrap();
        let changed = compute_changed_headers(&store).unwrap();
        assert_eq!(changed, vec![header_path.display().to_string()]);
    }

    #[test]
    fn compute_changed_headers_skips_headers_missing_from_disk() {
        use crate::model::HeaderOwnership;

        let mut store = Store::open_in_memory().unwrap();
        store
            .upsert_header_ownership(&HeaderOwnership {
                header_path: "/proj/gone.h".into(),
                content_hash: "deadbeef".into(),
                build_database_version_hash: "bdb1".into(),
                processed_at: 0,
            })
            .unwrap();

        assert!(compute_changed_headers(&store).unwrap().is_empty());
    }
}
