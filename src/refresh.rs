//! Incremental Refresh Engine (§4.6): turns a `Changeset` into store
//! mutations and a dispatch to the shared coordinator worker pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::args::{self, Rule};
use crate::builddb::BuildDatabase;
use crate::coordinator::{self, CancelToken, TaskOutcome};
use crate::error::Result;
use crate::header_tracker::HeaderTracker;
use crate::progress::ProgressRecord;
use crate::scanner::Changeset;
use crate::store::Store;

/// Set of source paths that must be (re-)extracted this refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactSet {
    pub paths: Vec<PathBuf>,
}

/// Compute the impact set for `changeset`: Added ∪ Modified, plus every
/// source that includes a header whose content hash changed, via the
/// reverse HeaderDependency closure (§4.6 step 2).
///
/// `changed_headers` is the set of header paths known to have changed this
/// refresh (typically: headers belonging to modified/added sources, plus
/// any header whose own content hash no longer matches its HeaderOwnership
/// record — computed by the caller before invoking this function).
pub fn compute_impact_set(
    store: &Store,
    changeset: &Changeset,
    changed_headers: &[String],
) -> Result<ImpactSet> {
    let mut impacted: HashSet<PathBuf> = changeset
        .added
        .iter()
        .chain(changeset.modified.iter())
        .cloned()
        .collect();

    for header in changed_headers {
        for source in store.sources_depending_on(header)? {
            impacted.insert(PathBuf::from(source));
        }
    }

    Ok(ImpactSet {
        paths: impacted.into_iter().collect(),
    })
}

/// Apply deletions first, per §4.6 step 1. Never touches headers: a source
/// file's removal drops its own symbols and outgoing header-dependency
/// edges, but a header's symbols are only removed when *that header* is
/// re-indexed, preserving header durability.
pub fn apply_deletions(store: &mut Store, changeset: &Changeset) -> Result<()> {
    for path in &changeset.deleted {
        store.delete_symbols_for_file(&path.display().to_string())?;
    }
    Ok(())
}

/// Run the impact set through the coordinator's worker pool, applying each
/// result to the store as it arrives and updating `progress`.
///
/// Each file's compile arguments are sanitized (§4.1) before the command
/// crosses into the worker pool, so the extractor only ever sees the
/// project's configured, parser-safe argument vector.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_impact_set(
    worker_binary: &std::path::Path,
    project_root: &Path,
    build_database: &BuildDatabase,
    impact_set: &ImpactSet,
    sanitizer_rules: &[Rule],
    pool_size: usize,
    header_tracker: Arc<HeaderTracker>,
    progress: Arc<ProgressRecord>,
    cancel: CancelToken,
    store: &mut Store,
) -> Result<()> {
    let mut commands = Vec::with_capacity(impact_set.paths.len());
    for path in &impact_set.paths {
        if let Some(command) = build_database.command_for(path) {
            let mut command = command.clone();
            command.arguments = args::sanitize(&command.arguments, sanitizer_rules)?;
            commands.push(command);
        }
    }

    let mut pending_results = Vec::new();
    coordinator::run_pool(
        worker_binary,
        project_root,
        commands,
        pool_size,
        &build_database.version_hash,
        header_tracker,
        progress,
        cancel,
        |outcome: TaskOutcome| pending_results.push(outcome),
    )?;

    for outcome in &pending_results {
        coordinator::apply_task_outcome(store, outcome)?;
    }

    Ok(())
}
